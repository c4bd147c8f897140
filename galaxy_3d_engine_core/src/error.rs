//! Error types for the Galaxy3D engine
//!
//! Every GPU resource operation reports one of these kinds. Fatal kinds
//! (allocation, mapping, corruption) are never retried internally: they are
//! logged once where they originate and handed to the caller.

use std::fmt;

/// Result type for Galaxy3D engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Galaxy3D engine errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Backend-specific error (driver reported an unexpected state)
    BackendError(String),

    /// Initialization failed (context, driver too old, ...)
    InitializationFailed(String),

    /// The driver could not produce a buffer handle or reserve its storage
    AllocationError(String),

    /// A mapping could not be established (driver returned no pointer)
    MappingError(String),

    /// Buffer contents were invalidated while mapped (context loss, ...)
    ///
    /// The backing storage must be considered gone; reload the whole buffer.
    CorruptionError(String),

    /// The operation needs a driver capability that is not present
    UnsupportedOperation(String),

    /// The caller broke an operation precondition (range, lock state, ...)
    PreconditionViolated(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::AllocationError(msg) => write!(f, "Allocation error: {}", msg),
            Error::MappingError(msg) => write!(f, "Mapping error: {}", msg),
            Error::CorruptionError(msg) => write!(f, "Data corrupted: {}", msg),
            Error::UnsupportedOperation(msg) => write!(f, "Unsupported operation: {}", msg),
            Error::PreconditionViolated(msg) => write!(f, "Precondition violated: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ===== ERROR MACROS =====

/// Build an [`Error`] of the given kind and log it at ERROR severity
///
/// # Example
///
/// ```no_run
/// use galaxy_3d_engine_core::engine_err;
///
/// let err = engine_err!("galaxy3d::gles::Buffer", MappingError, "Cannot map {} bytes", 64);
/// ```
#[macro_export]
macro_rules! engine_err {
    ($source:expr, $kind:ident, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::engine_error!($source, "{}", message);
        $crate::galaxy3d::Error::$kind(message)
    }};
}

/// Log and return an [`Error`] of the given kind from the current function
///
/// # Example
///
/// ```no_run
/// use galaxy_3d_engine_core::engine_bail;
/// use galaxy_3d_engine_core::galaxy3d::Result;
///
/// fn check(offset: usize, size: usize) -> Result<()> {
///     if offset > size {
///         engine_bail!("galaxy3d::gles::Buffer", PreconditionViolated, "offset {} past end", offset);
///     }
///     Ok(())
/// }
/// ```
#[macro_export]
macro_rules! engine_bail {
    ($source:expr, $kind:ident, $($arg:tt)*) => {
        return Err($crate::engine_err!($source, $kind, $($arg)*))
    };
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
