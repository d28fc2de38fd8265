//! Domain types for phivault.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`DependentId`], [`ResourceId`], [`VaultEntryId`], ...)
//! - **Error types** ([`PhiVaultError`], [`DetectorError`], [`StoreError`])
//! - **Result type alias** ([`Result`])
//!
//! # Type Safety
//!
//! ```rust
//! use phivault::domain::{DependentId, VaultEntryId};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let dependent = DependentId::new("dep-123")?;
//! let entry = VaultEntryId::new("65a1f0c2e4b0a1b2c3d4e5f6")?;
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod ids;
pub mod result;

pub use errors::{DetectorError, PhiVaultError, StoreError};
pub use ids::{DependentId, ResourceId, ResourceType, VaultDocumentId, VaultEntryId};
pub use result::Result;
