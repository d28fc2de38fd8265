//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the phivault configuration file.

use super::{EXIT_CONFIG, EXIT_OK};
use crate::config::load_config;
use crate::config::schema::{PhiVaultConfig, StoreTarget};
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // Loading also validates
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        println!("✅ Configuration is valid");
        println!();
        print_summary(&config);
        Ok(EXIT_OK)
    }
}

fn print_summary(config: &PhiVaultConfig) {
    println!("Configuration Summary:");
    println!("  Log Level: {}", config.application.log_level);
    println!("  Analyzer Endpoint: {}", config.detector.endpoint);
    println!(
        "  Analyzer Auth: {}",
        if config.detector.api_key.is_some() {
            "bearer token"
        } else {
            "none"
        }
    );
    println!("  Minimum Score: {}", config.detector.min_score);
    println!("  Analyzer Timeout: {} ms", config.detector.timeout_ms);
    println!("  Max Retries: {}", config.detector.retry.max_retries);

    match config.store.target {
        StoreTarget::Memory => println!("  Vault Store: memory (not persisted)"),
        StoreTarget::PostgreSQL => {
            if let Some(ref pg_config) = config.postgresql {
                use secrecy::ExposeSecret;
                println!("  Vault Store: PostgreSQL");
                println!(
                    "  PostgreSQL Connection: {}",
                    pg_config
                        .connection_string
                        .expose_secret()
                        .as_ref()
                        .rsplit('@')
                        .next()
                        .unwrap_or("***")
                );
                println!("  Max Connections: {}", pg_config.max_connections);
            }
        }
    }

    println!(
        "  Unresolved Tokens: {:?}",
        config.reconstruction.unresolved_tokens
    );
    println!();
}
