// PHI Vault - PHI detection and vault tokenization engine
// Copyright (c) 2025 PHI Vault Contributors
// Licensed under the MIT License

//! # phivault - PHI detection and vault tokenization
//!
//! phivault keeps protected health information out of a primary record store.
//! Free-text fields are scanned by an external analyzer, each detected value is
//! moved into a vault, and the text is rewritten with opaque tokens.
//! Authorized reads swap the tokens back.
//!
//! ## Overview
//!
//! - **Detecting** PHI spans in text through an HTTP analyzer, failing closed
//! - **Filtering** spans against a dependent's known identifiers and resolving overlaps
//! - **Vaulting** each value once per `(dependent, resource, field, value, type)`
//! - **Reconstructing** records by replacing `phi:vault:<TYPE>:<id>` tokens
//! - **De-identifying** demographics into birth year, sex and age band
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`vault`] - Detector, filter, redactor, reconstruction and the engine
//! - [`adapters`] - Vault store backends (PostgreSQL, in-memory)
//! - [`domain`] - Identifiers and error types
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and observability
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use phivault::adapters::database::create_vault_store;
//! use phivault::config::load_config;
//! use phivault::domain::{DependentId, ResourceId, ResourceType};
//! use phivault::vault::{PhiFieldSpec, PhiVaultEngine};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("phivault.toml")?;
//!     let store = create_vault_store(&config).await?;
//!     let engine = PhiVaultEngine::from_config(&config, store)?;
//!
//!     let resource_id = ResourceId::new("note-1")?;
//!     let sanitized = engine
//!         .vault_and_sanitize_fields(
//!             &ResourceType::new("Note")?,
//!             &resource_id,
//!             &DependentId::new("dep-1")?,
//!             &json!({"note": "Patient John Doe arrived for checkup."}),
//!             &[PhiFieldSpec::new("note")],
//!             None,
//!         )
//!         .await?;
//!
//!     let restored = engine.resolve_records(vec![sanitized], &[resource_id]).await?;
//!     println!("{}", restored.records[0]);
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`domain::Result`]. Detector failures
//! ([`domain::DetectorError`]) and store failures ([`domain::StoreError`])
//! abort the whole write, so a sanitized record is never returned with raw
//! PHI left in a declared field.
//!
//! ## Logging
//!
//! phivault uses structured logging with the `tracing` crate. Log events carry
//! identifiers, counts and entity types, never vaulted values.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod domain;
pub mod logging;
pub mod vault;
