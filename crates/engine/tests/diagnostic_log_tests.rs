//! Diagnostic Log Installation Tests
//!
//! Installing the global subscriber can only happen once per process, so
//! this file holds a single test and runs in its own test binary.

use kapokmq_engine::{init_diagnostic_log, DiagnosticLogError, LOG_DIR};
use tempfile::TempDir;

#[test]
fn install_once_then_report_error() {
    let dir = TempDir::new().unwrap();
    let log_dir = dir.path().join(LOG_DIR);

    let path = init_diagnostic_log(&log_dir).unwrap();
    assert!(path.starts_with(&log_dir));
    assert!(path.exists());
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("kapokmq-") && name.ends_with(".log"));

    let err = init_diagnostic_log(&log_dir).unwrap_err();
    assert!(matches!(err, DiagnosticLogError::Install(_)));
}
