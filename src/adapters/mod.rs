//! External system integrations for phivault.
//!
//! This module provides the vault store backends:
//!
//! - [`database`] - Store abstraction ([`PhiVaultStore`](database::PhiVaultStore)) and factory
//! - [`postgresql`] - PostgreSQL implementation
//! - [`memory`] - In-process implementation for tests and local runs
//!
//! # Design Pattern
//!
//! Adapters follow the **Adapter Pattern** to isolate external dependencies and
//! enable testing with in-memory implementations. The engine only sees the
//! [`PhiVaultStore`](database::PhiVaultStore) trait.
//!
//! ```rust,no_run
//! use phivault::adapters::database::create_vault_store;
//! use phivault::config::load_config;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("phivault.toml")?;
//! let store = create_vault_store(&config).await?;
//! store.ensure_schema().await?;
//! # Ok(())
//! # }
//! ```

pub mod database;
pub mod memory;
pub mod postgresql;
