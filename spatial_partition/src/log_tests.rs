//! Unit tests for log.rs
//!
//! Tests Logger trait, LogEntry, LogSeverity, and DefaultLogger.
//! Tests that swap the global logger live in tests/logging_integration_tests.rs.

use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
use std::time::SystemTime;

fn entry(severity: LogSeverity, message: &str, location: Option<(&'static str, u32)>) -> LogEntry {
    LogEntry {
        severity,
        timestamp: SystemTime::now(),
        source: "sps::SpatialPartition".to_string(),
        message: message.to_string(),
        file: location.map(|(file, _)| file),
        line: location.map(|(_, line)| line),
    }
}

// ============================================================================
// LOG SEVERITY TESTS
// ============================================================================

#[test]
fn test_log_severity_ordering() {
    assert!(LogSeverity::Trace < LogSeverity::Debug);
    assert!(LogSeverity::Debug < LogSeverity::Info);
    assert!(LogSeverity::Info < LogSeverity::Warn);
    assert!(LogSeverity::Warn < LogSeverity::Error);
}

#[test]
fn test_log_severity_debug() {
    assert_eq!(format!("{:?}", LogSeverity::Trace), "Trace");
    assert_eq!(format!("{:?}", LogSeverity::Warn), "Warn");
    assert_eq!(format!("{:?}", LogSeverity::Error), "Error");
}

// ============================================================================
// LOG ENTRY TESTS
// ============================================================================

#[test]
fn test_log_entry_without_file_line() {
    let e = entry(LogSeverity::Info, "configured", None);

    assert_eq!(e.severity, LogSeverity::Info);
    assert_eq!(e.source, "sps::SpatialPartition");
    assert_eq!(e.message, "configured");
    assert!(e.file.is_none());
    assert!(e.line.is_none());
}

#[test]
fn test_log_entry_with_file_line() {
    let e = entry(LogSeverity::Error, "bad extent", Some(("sps.rs", 42)));

    assert_eq!(e.file, Some("sps.rs"));
    assert_eq!(e.line, Some(42));
}

#[test]
fn test_log_entry_clone() {
    let e1 = entry(LogSeverity::Warn, "discarding records", Some(("sps.rs", 10)));
    let e2 = e1.clone();

    assert_eq!(e1.severity, e2.severity);
    assert_eq!(e1.source, e2.source);
    assert_eq!(e1.message, e2.message);
    assert_eq!(e1.file, e2.file);
    assert_eq!(e1.line, e2.line);
}

// ============================================================================
// DEFAULT LOGGER TESTS
// ============================================================================

#[test]
fn test_default_logger_all_severities_without_file_line() {
    let logger = DefaultLogger::with_min_severity(LogSeverity::Trace);
    for severity in [
        LogSeverity::Trace,
        LogSeverity::Debug,
        LogSeverity::Info,
        LogSeverity::Warn,
        LogSeverity::Error,
    ] {
        // Just verify it doesn't panic
        logger.log(&entry(severity, "message", None));
    }
}

#[test]
fn test_default_logger_error_with_file_line() {
    let logger = DefaultLogger::new();
    logger.log(&entry(LogSeverity::Error, "rejected config", Some(("config.rs", 7))));
}

#[test]
fn test_default_logger_filters_below_info() {
    let logger = DefaultLogger::default();
    assert_eq!(logger.min_severity(), LogSeverity::Info);
    assert!(!logger.enabled(LogSeverity::Trace));
    assert!(!logger.enabled(LogSeverity::Debug));
    assert!(logger.enabled(LogSeverity::Info));
    assert!(logger.enabled(LogSeverity::Error));

    // Filtered entries are dropped without output
    logger.log(&entry(LogSeverity::Trace, "quiet", None));
}

#[test]
fn test_default_logger_custom_floor() {
    let logger = DefaultLogger::with_min_severity(LogSeverity::Warn);
    assert!(!logger.enabled(LogSeverity::Info));
    assert!(logger.enabled(LogSeverity::Warn));

    let verbose = DefaultLogger::with_min_severity(LogSeverity::Trace);
    assert!(verbose.enabled(LogSeverity::Trace));
}

// ============================================================================
// LOGGER TRAIT TESTS
// ============================================================================

struct CountingLogger {
    logged_count: std::sync::Mutex<usize>,
}

impl Logger for CountingLogger {
    fn log(&self, _entry: &LogEntry) {
        *self.logged_count.lock().unwrap() += 1;
    }
}

#[test]
fn test_custom_logger_implementation() {
    let logger = CountingLogger { logged_count: std::sync::Mutex::new(0) };

    logger.log(&entry(LogSeverity::Info, "a", None));
    logger.log(&entry(LogSeverity::Info, "b", None));

    assert_eq!(*logger.logged_count.lock().unwrap(), 2);
}

#[test]
fn test_logger_trait_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<DefaultLogger>();
}
