//! Domain error types
//!
//! This module defines the error hierarchy for phivault. Detector failures and
//! vault store failures are kept in separate enums so callers can tell a
//! fail-closed detection abort from a persistence abort.
//! All errors are domain-specific and don't expose third-party types.

use thiserror::Error;

/// Main phivault error type
///
/// This is the primary error type used throughout the library.
#[derive(Debug, Error)]
pub enum PhiVaultError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// PHI analyzer / detector errors
    #[error("Detector error: {0}")]
    Detector(#[from] DetectorError),

    /// Vault store errors
    #[error("Vault store error: {0}")]
    Store(#[from] StoreError),

    /// Validation errors (malformed input from the caller)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

impl PhiVaultError {
    /// Returns `true` if this error came from the detector boundary
    pub fn is_detector_failure(&self) -> bool {
        matches!(self, PhiVaultError::Detector(_))
    }

    /// Returns `true` if this error came from the vault store
    pub fn is_store_failure(&self) -> bool {
        matches!(self, PhiVaultError::Store(_))
    }
}

/// PHI analyzer errors
///
/// Errors that occur when calling the external text-analysis service.
/// Every variant aborts the enclosing write: raw text is never persisted
/// because detection could not run.
#[derive(Debug, Clone, Error)]
pub enum DetectorError {
    /// Failed to reach the analyzer
    #[error("Failed to connect to PHI analyzer: {0}")]
    ConnectionFailed(String),

    /// Analyzer call exceeded the configured timeout
    #[error("PHI analyzer timed out after {0} ms")]
    Timeout(u64),

    /// Circuit breaker is open after repeated failures
    #[error("PHI analyzer circuit breaker is open, retry in {retry_after_ms} ms")]
    CircuitOpen { retry_after_ms: u64 },

    /// Server error (5xx)
    #[error("Analyzer server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    /// Client error (4xx)
    #[error("Analyzer client error: {status} - {message}")]
    ClientError { status: u16, message: String },

    /// Response body could not be interpreted
    #[error("Invalid analyzer response: {0}")]
    InvalidResponse(String),

    /// A span did not fit the analyzed text
    #[error("Invalid span {start}..{end} for text of {len} bytes")]
    InvalidSpan { start: usize, end: usize, len: usize },
}

impl DetectorError {
    /// Whether retrying the same call may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DetectorError::ConnectionFailed(_)
                | DetectorError::Timeout(_)
                | DetectorError::ServerError { .. }
        )
    }
}

/// Vault store errors
///
/// Errors that occur when persisting or reading vault data.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Failed to connect to the store
    #[error("Failed to connect to vault store: {0}")]
    ConnectionFailed(String),

    /// Read query failed
    #[error("Vault query failed: {0}")]
    QueryFailed(String),

    /// Write failed; the enclosing substitution is aborted
    #[error("Vault write failed: {0}")]
    WriteFailed(String),

    /// Referenced document does not exist
    #[error("Vault document not found: {0}")]
    DocumentNotFound(String),

    /// Uniqueness conflict that could not be merged
    #[error("Vault conflict: {0}")]
    Conflict(String),

    /// Stored data could not be decoded
    #[error("Failed to decode vault data: {0}")]
    DeserializationFailed(String),
}

// Conversion from std::io::Error
impl From<std::io::Error> for PhiVaultError {
    fn from(err: std::io::Error) -> Self {
        PhiVaultError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for PhiVaultError {
    fn from(err: serde_json::Error) -> Self {
        PhiVaultError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for PhiVaultError {
    fn from(err: toml::de::Error) -> Self {
        PhiVaultError::Configuration(format!("TOML parse error: {err}"))
    }
}
