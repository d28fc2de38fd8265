//! Vault store abstraction layer
//!
//! This module provides a trait-based abstraction over vault persistence,
//! allowing the engine to run against PostgreSQL or the in-process store.

pub mod factory;
pub mod traits;

pub use factory::create_vault_store;
pub use traits::PhiVaultStore;
