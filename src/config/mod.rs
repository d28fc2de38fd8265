//! Configuration management for phivault.
//!
//! TOML-based configuration with `${VAR_NAME}` substitution, `PHIVAULT_*`
//! environment overrides and validation on load.
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//!
//! [detector]
//! endpoint = "http://localhost:5002"
//! api_key = "${PHIVAULT_ANALYZER_KEY}"
//! min_score = 0.5
//! timeout_ms = 5000
//!
//! [detector.retry]
//! max_retries = 2
//!
//! [detector.circuit_breaker]
//! failure_threshold = 5
//! open_for_ms = 30000
//!
//! [store]
//! target = "postgresql"
//!
//! [postgresql]
//! connection_string = "${PHIVAULT_DATABASE_URL}"
//!
//! [reconstruction]
//! unresolved_tokens = "pass_through"
//! ```
//!
//! ```rust,no_run
//! use phivault::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("phivault.toml")?;
//! println!("Analyzer: {}", config.detector.endpoint);
//! # Ok(())
//! # }
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

pub use loader::{load_config, parse_config};
pub use schema::{
    ApplicationConfig, CircuitBreakerConfig, DetectorConfig, LoggingConfig, PhiVaultConfig,
    PostgreSQLConfig, ReconstructionConfig, RetryConfig, StoreConfig, StoreTarget,
};
pub use secret::{secret_string, SecretString, SecretValue};
