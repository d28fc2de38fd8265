//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{PhiVaultConfig, StoreTarget};
use super::secret::secret_string;
use crate::domain::errors::PhiVaultError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (`${VAR}` syntax)
/// 3. Parses the TOML into [`PhiVaultConfig`]
/// 4. Applies environment variable overrides (`PHIVAULT_*` prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns [`PhiVaultError::Configuration`] if any step fails.
///
/// # Examples
///
/// ```no_run
/// use phivault::config::load_config;
///
/// let config = load_config("phivault.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<PhiVaultConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(PhiVaultError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        PhiVaultError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_config(&contents)
}

/// Parses configuration from TOML text, applying substitution, overrides and validation
pub fn parse_config(contents: &str) -> Result<PhiVaultConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: PhiVaultConfig = toml::from_str(&contents)
        .map_err(|e| PhiVaultError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        PhiVaultError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

fn env_var_regex() -> &'static Regex {
    static ENV_RE: OnceLock<Regex> = OnceLock::new();
    ENV_RE.get_or_init(|| Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("env var pattern is valid"))
}

/// Substitutes environment variables in the format `${VAR_NAME}`
///
/// Comment lines are copied untouched.
///
/// # Errors
///
/// Returns an error listing every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = env_var_regex();
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let processed = re.replace_all(line, |caps: &regex::Captures<'_>| {
            let var_name = &caps[1];
            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                    String::new()
                }
            }
        });
        result.push_str(&processed);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(PhiVaultError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

fn parse_override<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| PhiVaultError::Configuration(format!("Invalid value for {name}: '{value}'")))
}

/// Applies environment variable overrides using the `PHIVAULT_*` prefix
///
/// Variables follow the pattern `PHIVAULT_<SECTION>_<KEY>`, for example
/// `PHIVAULT_DETECTOR_ENDPOINT` or `PHIVAULT_STORE_TARGET`.
fn apply_env_overrides(config: &mut PhiVaultConfig) -> Result<()> {
    if let Ok(val) = std::env::var("PHIVAULT_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    // Detector overrides
    if let Ok(val) = std::env::var("PHIVAULT_DETECTOR_ENDPOINT") {
        config.detector.endpoint = val;
    }
    if let Ok(val) = std::env::var("PHIVAULT_DETECTOR_API_KEY") {
        config.detector.api_key = Some(secret_string(val));
    }
    if let Ok(val) = std::env::var("PHIVAULT_DETECTOR_MIN_SCORE") {
        config.detector.min_score = parse_override("PHIVAULT_DETECTOR_MIN_SCORE", &val)?;
    }
    if let Ok(val) = std::env::var("PHIVAULT_DETECTOR_TIMEOUT_MS") {
        config.detector.timeout_ms = parse_override("PHIVAULT_DETECTOR_TIMEOUT_MS", &val)?;
    }

    // Store overrides
    if let Ok(val) = std::env::var("PHIVAULT_STORE_TARGET") {
        config.store.target = match val.to_lowercase().as_str() {
            "memory" => StoreTarget::Memory,
            "postgresql" => StoreTarget::PostgreSQL,
            _ => {
                return Err(PhiVaultError::Configuration(format!(
                    "Invalid PHIVAULT_STORE_TARGET: {val}"
                )))
            }
        };
    }
    if let Some(ref mut pg) = config.postgresql {
        if let Ok(val) = std::env::var("PHIVAULT_POSTGRESQL_CONNECTION_STRING") {
            pg.connection_string = secret_string(val);
        }
        if let Ok(val) = std::env::var("PHIVAULT_POSTGRESQL_MAX_CONNECTIONS") {
            pg.max_connections = parse_override("PHIVAULT_POSTGRESQL_MAX_CONNECTIONS", &val)?;
        }
    }

    // Logging overrides
    if let Ok(val) = std::env::var("PHIVAULT_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = parse_override("PHIVAULT_LOGGING_LOCAL_ENABLED", &val)?;
    }
    if let Ok(val) = std::env::var("PHIVAULT_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}
