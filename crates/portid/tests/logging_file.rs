//! File logging through the global subscriber.
//!
//! The subscriber is process-global, so this binary holds a single test.

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

use std::fs;

use portid::logging::{init_logging, log_security_event, LogConfig, LogFormat, LogLevel};
use tempfile::TempDir;

#[test]
fn test_json_events_reach_rolling_file() {
    let dir = TempDir::new().unwrap();
    let log_path = dir.path().join("logs").join("portid.log");

    let guard = init_logging(&LogConfig {
        level: LogLevel::Info,
        format: LogFormat::Json,
        file_path: Some(log_path),
    })
    .unwrap();

    tracing::debug!("below the configured level");
    log_security_event("private_key_export", "signing");
    drop(guard);

    let files: Vec<_> = fs::read_dir(dir.path().join("logs"))
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(files.len(), 1);
    let name = files[0].file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("portid.log."), "{name}");

    let content = fs::read_to_string(&files[0]).unwrap();
    let line = content.lines().next().unwrap();
    let event: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(event["target"], "portid::security");
    assert_eq!(event["fields"]["security_event"], "private_key_export");
    assert_eq!(event["fields"]["reference"], "signing");
    assert!(!content.contains("below the configured level"));
}
