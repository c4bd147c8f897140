/*!
# Galaxy 3D Engine - Core

Platform-agnostic types shared by the Galaxy 3D rendering backends.

This crate holds everything a backend needs that is not tied to a specific
graphics API: the error type, the engine logging system and the hardware
buffer vocabulary (targets, usage flags, lock options). Backends such as
`galaxy_3d_engine_renderer_gles` build their GPU resources on top of it.

## Architecture

- **Error / Result**: error kinds reported by GPU resources
- **Engine**: global logger registry used by the `engine_*!` macros
- **Logger**: pluggable log sink (colored console output by default)
- **Buffer vocabulary**: `BufferTarget`, `BufferUsage`, `LockOptions`, `BufferDesc`
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod buffer;

// Main galaxy3d namespace module
pub mod galaxy3d {
    // Error types
    pub use crate::error::{Error, Result};

    // Logger registry
    pub use crate::engine::Engine;

    // Logging sub-module (types only, macros live at the crate root)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Hardware buffer vocabulary
    pub mod buffer {
        pub use crate::buffer::*;
    }
}
