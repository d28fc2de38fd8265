//! PostgreSQL vault store
//!
//! This module provides the PostgreSQL implementation of the vault store,
//! backed by the `phi_vault_entries` and `structured_phi_vaults` tables.

pub mod adapter;
pub mod client;
pub mod models;

pub use adapter::PostgreSQLAdapter;
pub use client::PostgreSQLClient;
pub use models::{PostgreSQLStructuredVault, PostgreSQLVaultEntry};
