//! Vault store abstraction
//!
//! This module defines the trait that vault store adapters must implement to
//! back the PHI engine.

use crate::domain::{DependentId, ResourceId, Result, VaultDocumentId, VaultEntryId};
use crate::vault::models::{
    NewPhiEntry, StructuredPhiPayload, StructuredVaultDocument, UnstructuredVaultEntry,
};
use async_trait::async_trait;
use std::collections::HashMap;

/// Persistence contract for vault data
///
/// Implementations must make each write method atomic: either every entry of
/// a call is durably stored or the call fails with a
/// [`StoreError`](crate::domain::StoreError) and nothing is visible.
#[async_trait]
pub trait PhiVaultStore: Send + Sync {
    /// Find-or-create one unstructured entry per input, in input order
    ///
    /// Entries are deduplicated on
    /// `(dependent_id, resource_id, field_path, value, phi_type)`: the first
    /// write of a key creates the id, later writes only refresh `updated_at`
    /// and return the same id.
    ///
    /// # Errors
    ///
    /// Returns a store error if the write fails.
    async fn upsert_phi_entries(&self, entries: &[NewPhiEntry]) -> Result<Vec<VaultEntryId>>;

    /// Fetch every unstructured entry belonging to the given resources
    ///
    /// # Errors
    ///
    /// Returns a store error if the query fails.
    async fn get_unstructured_phi_vault_entries(
        &self,
        resource_ids: &[ResourceId],
    ) -> Result<Vec<UnstructuredVaultEntry>>;

    /// Create or merge-update the demographic document of a dependent
    ///
    /// # Arguments
    ///
    /// * `dependent_id` - Owner of the document
    /// * `payload` - Fields to write; absent fields are left unchanged
    /// * `existing_vault_id` - Document to update, if the caller already knows it
    ///
    /// # Returns
    ///
    /// The id of the single document for `dependent_id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DocumentNotFound`](crate::domain::StoreError::DocumentNotFound)
    /// if `existing_vault_id` does not name a document of `dependent_id`.
    async fn upsert_structured_phi_vault(
        &self,
        dependent_id: &DependentId,
        payload: &StructuredPhiPayload,
        existing_vault_id: Option<&VaultDocumentId>,
    ) -> Result<VaultDocumentId>;

    /// Fetch one demographic document by id
    async fn get_structured_phi_vault(
        &self,
        id: &VaultDocumentId,
    ) -> Result<Option<StructuredVaultDocument>>;

    /// Fetch several demographic documents keyed by id; misses are omitted
    async fn get_structured_phi_vaults(
        &self,
        ids: &[VaultDocumentId],
    ) -> Result<HashMap<VaultDocumentId, StructuredVaultDocument>>;

    /// Fetch the demographic document of a dependent
    async fn get_structured_phi_vault_by_dependent_id(
        &self,
        dependent_id: &DependentId,
    ) -> Result<Option<StructuredVaultDocument>>;

    /// Test the store connection
    ///
    /// # Errors
    ///
    /// Returns an error if the connection test fails.
    async fn test_connection(&self) -> Result<()>;

    /// Create tables and indexes if they do not exist
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be applied.
    async fn ensure_schema(&self) -> Result<()>;

    /// Short name of the backing store, for logs
    fn store_name(&self) -> &str;
}
