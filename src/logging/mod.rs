//! Logging and observability
//!
//! This module provides structured logging with support for:
//! - JSON-formatted file logs
//! - Configurable log levels
//! - Local file logging with rotation
//!
//! Vaulted values never reach the logs. The macros below record identifiers,
//! counts and entity types only.
//!
//! # Example
//!
//! ```no_run
//! use phivault::logging::init_logging;
//! use phivault::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log that a record field was sanitized
///
/// # Example
///
/// ```no_run
/// use phivault::log_field_sanitized;
///
/// log_field_sanitized!("note-1", "/note", 2, ["PERSON", "PHONE_NUMBER"]);
/// ```
#[macro_export]
macro_rules! log_field_sanitized {
    ($resource_id:expr, $pointer:expr, $span_count:expr, $entity_types:expr) => {
        tracing::debug!(
            resource_id = %$resource_id,
            field = %$pointer,
            spans = $span_count,
            entity_types = ?$entity_types,
            "Sanitized PHI field"
        );
    };
}

/// Log tokens left unresolved on the read path
///
/// # Example
///
/// ```no_run
/// use phivault::log_unresolved_tokens;
///
/// log_unresolved_tokens!(3, "records");
/// ```
#[macro_export]
macro_rules! log_unresolved_tokens {
    ($count:expr, $source:expr) => {
        tracing::warn!(
            unresolved = $count,
            source = $source,
            "Vault tokens without a matching entry"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use phivault::log_error_with_context;
/// use phivault::domain::PhiVaultError;
///
/// let error = PhiVaultError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}

/// Log a retry attempt
///
/// # Example
///
/// ```no_run
/// use phivault::log_retry_attempt;
///
/// log_retry_attempt!(2, 3, "Connection timeout");
/// ```
#[macro_export]
macro_rules! log_retry_attempt {
    ($attempt:expr, $max_attempts:expr, $reason:expr) => {
        tracing::warn!(
            attempt = $attempt,
            max_attempts = $max_attempts,
            reason = $reason,
            "Retrying operation"
        );
    };
}
