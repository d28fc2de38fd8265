//! Migrate command implementation
//!
//! This module implements the `migrate` command, which creates the vault
//! tables and indexes in the configured store.

use super::{exit_code, load_or_report, EXIT_OK};
use crate::adapters::database::create_vault_store;
use clap::Args;

/// Arguments for the migrate command
#[derive(Args, Debug)]
pub struct MigrateArgs {}

impl MigrateArgs {
    /// Execute the migrate command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Applying vault schema");

        let config = match load_or_report(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        let store = match create_vault_store(&config).await {
            Ok(s) => s,
            Err(e) => {
                println!("❌ Failed to open vault store");
                println!("   Error: {e}");
                return Ok(exit_code(&e));
            }
        };

        if let Err(e) = store.test_connection().await {
            println!("❌ Failed to connect to {} vault store", store.store_name());
            println!("   Error: {e}");
            return Ok(exit_code(&e));
        }

        if let Err(e) = store.ensure_schema().await {
            println!("❌ Failed to apply vault schema");
            println!("   Error: {e}");
            return Ok(exit_code(&e));
        }

        println!("✅ Vault schema is up to date ({})", store.store_name());
        Ok(EXIT_OK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_migrate_memory_store() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("phivault.toml");
        std::fs::write(
            &path,
            "[detector]\nendpoint = \"http://localhost:5002\"\n",
        )
        .unwrap();

        let code = MigrateArgs {}
            .execute(path.to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(code, EXIT_OK);
    }
}
