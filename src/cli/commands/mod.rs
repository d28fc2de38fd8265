//! CLI command implementations
//!
//! This module contains all CLI command implementations and the helpers they
//! share for loading input and opening the engine.

pub mod migrate;
pub mod profile;
pub mod resolve;
pub mod sanitize;
pub mod validate;

use crate::adapters::database::create_vault_store;
use crate::config::{load_config, PhiVaultConfig};
use crate::domain::{PhiVaultError, StoreError};
use crate::vault::PhiVaultEngine;
use tokio::io::AsyncReadExt;

/// Exit code for a successful run
pub const EXIT_OK: i32 = 0;
/// Exit code for configuration errors
pub const EXIT_CONFIG: i32 = 2;
/// Exit code for invalid input
pub const EXIT_VALIDATION: i32 = 3;
/// Exit code when the analyzer or store is unreachable
pub const EXIT_CONNECTION: i32 = 4;
/// Exit code for anything else
pub const EXIT_FATAL: i32 = 5;

/// Maps an engine error to a process exit code
pub fn exit_code(error: &PhiVaultError) -> i32 {
    match error {
        PhiVaultError::Configuration(_) => EXIT_CONFIG,
        PhiVaultError::Validation(_) | PhiVaultError::Serialization(_) => EXIT_VALIDATION,
        PhiVaultError::Detector(_) => EXIT_CONNECTION,
        PhiVaultError::Store(StoreError::ConnectionFailed(_)) => EXIT_CONNECTION,
        PhiVaultError::Store(_) | PhiVaultError::Io(_) => EXIT_FATAL,
    }
}

/// Reads a file, or stdin when `path` is `-`
pub(crate) async fn read_input(path: &str) -> std::io::Result<String> {
    if path == "-" {
        let mut buffer = String::new();
        tokio::io::stdin().read_to_string(&mut buffer).await?;
        Ok(buffer)
    } else {
        tokio::fs::read_to_string(path).await
    }
}

/// Loads the configuration, printing the failure and its exit code on error
pub(crate) fn load_or_report(config_path: &str) -> Result<PhiVaultConfig, i32> {
    load_config(config_path).map_err(|e| {
        eprintln!("❌ Failed to load configuration file");
        eprintln!("   Error: {e}");
        EXIT_CONFIG
    })
}

/// Opens the configured store and builds an engine over it
pub(crate) async fn open_engine(config: &PhiVaultConfig) -> Result<PhiVaultEngine, i32> {
    let store = create_vault_store(config).await.map_err(|e| {
        eprintln!("❌ Failed to open vault store");
        eprintln!("   Error: {e}");
        exit_code(&e)
    })?;

    PhiVaultEngine::from_config(config, store).map_err(|e| {
        eprintln!("❌ Failed to create PHI analyzer client");
        eprintln!("   Error: {e}");
        exit_code(&e)
    })
}

/// Prints an engine failure and returns its exit code
pub(crate) fn report(action: &str, error: &PhiVaultError) -> i32 {
    crate::log_error_with_context!(error, action);
    eprintln!("❌ {action} failed");
    eprintln!("   Error: {error}");
    exit_code(error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DetectorError;
    use test_case::test_case;

    #[test_case(PhiVaultError::Configuration("x".into()), EXIT_CONFIG; "configuration")]
    #[test_case(PhiVaultError::Validation("x".into()), EXIT_VALIDATION; "validation")]
    #[test_case(PhiVaultError::Detector(DetectorError::Timeout(100)), EXIT_CONNECTION; "detector")]
    #[test_case(PhiVaultError::Store(StoreError::ConnectionFailed("x".into())), EXIT_CONNECTION; "store connection")]
    #[test_case(PhiVaultError::Store(StoreError::WriteFailed("x".into())), EXIT_FATAL; "store write")]
    fn test_exit_code(error: PhiVaultError, expected: i32) {
        assert_eq!(exit_code(&error), expected);
    }

    #[tokio::test]
    async fn test_read_input_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("record.json");
        std::fs::write(&path, r#"{"note": "hello"}"#).unwrap();

        let contents = read_input(path.to_str().unwrap()).await.unwrap();
        assert_eq!(contents, r#"{"note": "hello"}"#);
    }

    #[test]
    fn test_load_or_report_missing_file() {
        assert_eq!(
            load_or_report("/nonexistent/phivault.toml").unwrap_err(),
            EXIT_CONFIG
        );
    }
}
