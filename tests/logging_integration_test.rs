//! Integration tests for logging functionality

use phivault::config::LoggingConfig;
use phivault::logging::init_logging;
use tempfile::TempDir;

#[test]
fn test_logging_config_default() {
    let config = LoggingConfig::default();
    assert!(!config.local_enabled);
    assert_eq!(config.local_rotation, "daily");
}

#[test]
fn test_file_logging_creates_directory() {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("logs");

    let config = LoggingConfig {
        local_enabled: true,
        local_path: log_path.to_string_lossy().to_string(),
        local_rotation: "daily".to_string(),
    };

    // Only one global subscriber per process, so this binary initializes once
    let guard = init_logging("debug", &config).unwrap();
    tracing::info!(resource_id = "note-1", "Sanitized PHI fields");
    drop(guard);

    assert!(log_path.exists());
}

#[test]
fn test_invalid_log_level_rejected_before_init() {
    let config = LoggingConfig::default();
    assert!(init_logging("verbose", &config).is_err());
}
