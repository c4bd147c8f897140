//! Integration tests for Engine logging system
//!
//! These tests verify the public logging API and the exported macros.
//! No GPU required.
//!
//! Run with: cargo test --test logging_integration_tests

use galaxy_3d_engine_core::galaxy3d::{Engine, Error};
use galaxy_3d_engine_core::galaxy3d::log::{Logger, LogEntry, LogSeverity};
use galaxy_3d_engine_core::{engine_debug, engine_err, engine_info, engine_trace, engine_warn};
use std::sync::{Arc, Mutex};
use serial_test::serial;

// ============================================================================
// TEST LOGGER IMPLEMENTATION
// ============================================================================

/// Test logger that captures log entries for verification
struct TestLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl TestLogger {
    fn new() -> (Self, Arc<Mutex<Vec<LogEntry>>>) {
        let entries = Arc::new(Mutex::new(Vec::new()));
        (Self { entries: entries.clone() }, entries)
    }
}

impl Logger for TestLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

// ============================================================================
// LOGGING TESTS
// ============================================================================

#[test]
#[serial]
fn test_integration_macros_route_to_custom_logger() {
    let (test_logger, entries) = TestLogger::new();
    Engine::set_logger(test_logger);

    engine_trace!("galaxy3d::gles::Buffer", "lock [{}, {})", 0, 64);
    engine_debug!("galaxy3d::gles::Buffer", "Created buffer #{}", 1);
    engine_info!("galaxy3d::gles::Context", "OpenGL ES {}.{}", 3, 0);
    engine_warn!("galaxy3d::gles::Buffer", "Buffer #{} destroyed while locked", 1);

    let captured = entries.lock().unwrap();
    let severities: Vec<LogSeverity> = captured.iter().map(|e| e.severity).collect();
    assert_eq!(
        severities,
        vec![LogSeverity::Trace, LogSeverity::Debug, LogSeverity::Info, LogSeverity::Warn]
    );
    assert_eq!(captured[0].message, "lock [0, 64)");
    assert_eq!(captured[2].source, "galaxy3d::gles::Context");
    drop(captured);

    Engine::reset_logger();
}

#[test]
#[serial]
fn test_integration_engine_err_logs_with_location() {
    let (test_logger, entries) = TestLogger::new();
    Engine::set_logger(test_logger);

    let err = engine_err!("galaxy3d::gles::Buffer", CorruptionError, "Buffer data corrupted, please reload");
    assert!(matches!(err, Error::CorruptionError(_)));

    let captured = entries.lock().unwrap();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].severity, LogSeverity::Error);
    assert_eq!(captured[0].message, "Buffer data corrupted, please reload");
    assert!(captured[0].file.is_some());
    assert!(captured[0].line.is_some());
    drop(captured);

    Engine::reset_logger();
}
