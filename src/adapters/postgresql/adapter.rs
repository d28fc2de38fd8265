//! PostgreSQL adapter implementing the vault store trait
//!
//! Every write is a single transaction. Dedup and the one-document-per-
//! dependent rule are enforced by unique indexes with `ON CONFLICT` upserts,
//! so concurrent writers converge on the same row.

use crate::adapters::database::traits::PhiVaultStore;
use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::adapters::postgresql::models::{
    payload_to_jsonb, value_digest, PostgreSQLStructuredVault, PostgreSQLVaultEntry,
    DOCUMENT_COLUMNS, ENTRY_COLUMNS,
};
use crate::domain::{
    DependentId, ResourceId, Result, StoreError, VaultDocumentId, VaultEntryId,
};
use crate::vault::models::{
    NewPhiEntry, StructuredPhiPayload, StructuredVaultDocument, UnstructuredVaultEntry,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;

const UPSERT_ENTRY_SQL: &str = r#"
    INSERT INTO phi_vault_entries (
        id, dependent_id, resource_type, resource_id, field_path,
        value, value_sha256, phi_type, created_at, updated_at
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
    ON CONFLICT (dependent_id, resource_id, field_path, phi_type, value_sha256) DO UPDATE SET
        updated_at = EXCLUDED.updated_at
    RETURNING id
"#;

const UPDATE_DOCUMENT_SQL: &str = r#"
    UPDATE structured_phi_vaults
    SET phi = phi || $3::jsonb, updated_at = $4
    WHERE id = $1 AND dependent_id = $2
    RETURNING id
"#;

const UPSERT_DOCUMENT_SQL: &str = r#"
    INSERT INTO structured_phi_vaults (id, dependent_id, phi, created_at, updated_at)
    VALUES ($1, $2, $3, $4, $4)
    ON CONFLICT (dependent_id) DO UPDATE SET
        phi = structured_phi_vaults.phi || EXCLUDED.phi,
        updated_at = EXCLUDED.updated_at
    RETURNING id
"#;

/// PostgreSQL implementation of [`PhiVaultStore`]
pub struct PostgreSQLAdapter {
    client: Arc<PostgreSQLClient>,
}

impl PostgreSQLAdapter {
    /// Create a new PostgreSQL adapter
    pub fn new(client: PostgreSQLClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    /// Create a new PostgreSQL adapter with an Arc-wrapped client
    pub fn new_with_arc(client: Arc<PostgreSQLClient>) -> Self {
        Self { client }
    }

    /// Get a reference to the underlying client
    pub fn client(&self) -> &Arc<PostgreSQLClient> {
        &self.client
    }

    fn returned_id<T>(
        row: &tokio_postgres::Row,
        parse: impl FnOnce(String) -> std::result::Result<T, String>,
    ) -> Result<T> {
        let raw: String = row.try_get("id").map_err(|e| {
            StoreError::DeserializationFailed(format!("Upsert returned no id: {e}"))
        })?;
        parse(raw).map_err(|e| StoreError::DeserializationFailed(e).into())
    }
}

#[async_trait]
impl PhiVaultStore for PostgreSQLAdapter {
    async fn upsert_phi_entries(&self, entries: &[NewPhiEntry]) -> Result<Vec<VaultEntryId>> {
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let now = Utc::now();
        let mut conn = self.client.get_connection().await?;
        let tx = conn.transaction().await.map_err(|e| {
            StoreError::WriteFailed(format!("Failed to begin vault transaction: {e}"))
        })?;

        let mut ids = Vec::with_capacity(entries.len());
        for entry in entries {
            let candidate = VaultEntryId::generate();
            let row = tx
                .query_one(
                    UPSERT_ENTRY_SQL,
                    &[
                        &candidate.as_str(),
                        &entry.dependent_id.as_str(),
                        &entry.resource_type.as_str(),
                        &entry.resource_id.as_str(),
                        &entry.field_path,
                        &entry.value,
                        &value_digest(&entry.value),
                        &entry.phi_type.as_str(),
                        &now,
                    ],
                )
                .await
                .map_err(|e| StoreError::WriteFailed(format!("Vault entry upsert failed: {e}")))?;
            ids.push(Self::returned_id(&row, VaultEntryId::new)?);
        }

        tx.commit().await.map_err(|e| {
            StoreError::WriteFailed(format!("Failed to commit vault entries: {e}"))
        })?;

        tracing::debug!(
            entries = entries.len(),
            "Upserted PHI vault entries in PostgreSQL"
        );
        Ok(ids)
    }

    async fn get_unstructured_phi_vault_entries(
        &self,
        resource_ids: &[ResourceId],
    ) -> Result<Vec<UnstructuredVaultEntry>> {
        if resource_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<&str> = resource_ids.iter().map(ResourceId::as_str).collect();
        let query =
            format!("SELECT {ENTRY_COLUMNS} FROM phi_vault_entries WHERE resource_id = ANY($1)");
        let rows = self.client.query(&query, &[&ids]).await?;

        let entries = rows
            .iter()
            .map(|row| PostgreSQLVaultEntry::from_row(row)?.to_domain())
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            resources = resource_ids.len(),
            entries = entries.len(),
            "Loaded PHI vault entries from PostgreSQL"
        );
        Ok(entries)
    }

    async fn upsert_structured_phi_vault(
        &self,
        dependent_id: &DependentId,
        payload: &StructuredPhiPayload,
        existing_vault_id: Option<&VaultDocumentId>,
    ) -> Result<VaultDocumentId> {
        let body = payload_to_jsonb(payload)?;
        let now = Utc::now();
        let mut conn = self.client.get_connection().await?;
        let tx = conn.transaction().await.map_err(|e| {
            StoreError::WriteFailed(format!("Failed to begin vault transaction: {e}"))
        })?;

        let row = match existing_vault_id {
            Some(id) => tx
                .query_opt(
                    UPDATE_DOCUMENT_SQL,
                    &[&id.as_str(), &dependent_id.as_str(), &body, &now],
                )
                .await
                .map_err(|e| {
                    StoreError::WriteFailed(format!("Structured vault update failed: {e}"))
                })?
                .ok_or_else(|| {
                    StoreError::DocumentNotFound(format!(
                        "Structured vault {id} for dependent {dependent_id}"
                    ))
                })?,
            None => {
                let candidate = VaultDocumentId::generate();
                tx.query_one(
                    UPSERT_DOCUMENT_SQL,
                    &[&candidate.as_str(), &dependent_id.as_str(), &body, &now],
                )
                .await
                .map_err(|e| {
                    StoreError::WriteFailed(format!("Structured vault upsert failed: {e}"))
                })?
            }
        };
        let id = Self::returned_id(&row, VaultDocumentId::new)?;

        tx.commit().await.map_err(|e| {
            StoreError::WriteFailed(format!("Failed to commit structured vault: {e}"))
        })?;

        tracing::debug!(
            dependent_id = %dependent_id,
            vault_id = %id,
            "Upserted structured PHI vault in PostgreSQL"
        );
        Ok(id)
    }

    async fn get_structured_phi_vault(
        &self,
        id: &VaultDocumentId,
    ) -> Result<Option<StructuredVaultDocument>> {
        let query = format!("SELECT {DOCUMENT_COLUMNS} FROM structured_phi_vaults WHERE id = $1");
        let rows = self.client.query(&query, &[&id.as_str()]).await?;

        rows.first()
            .map(|row| PostgreSQLStructuredVault::from_row(row)?.to_domain())
            .transpose()
    }

    async fn get_structured_phi_vaults(
        &self,
        ids: &[VaultDocumentId],
    ) -> Result<HashMap<VaultDocumentId, StructuredVaultDocument>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let raw: Vec<&str> = ids.iter().map(VaultDocumentId::as_str).collect();
        let query =
            format!("SELECT {DOCUMENT_COLUMNS} FROM structured_phi_vaults WHERE id = ANY($1)");
        let rows = self.client.query(&query, &[&raw]).await?;

        rows.iter()
            .map(|row| {
                let doc = PostgreSQLStructuredVault::from_row(row)?.to_domain()?;
                Ok((doc.id.clone(), doc))
            })
            .collect()
    }

    async fn get_structured_phi_vault_by_dependent_id(
        &self,
        dependent_id: &DependentId,
    ) -> Result<Option<StructuredVaultDocument>> {
        let query = format!(
            "SELECT {DOCUMENT_COLUMNS} FROM structured_phi_vaults WHERE dependent_id = $1"
        );
        let rows = self.client.query(&query, &[&dependent_id.as_str()]).await?;

        rows.first()
            .map(|row| PostgreSQLStructuredVault::from_row(row)?.to_domain())
            .transpose()
    }

    async fn test_connection(&self) -> Result<()> {
        self.client.test_connection().await
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.client.ensure_schema().await
    }

    fn store_name(&self) -> &str {
        "postgresql"
    }
}
