//! PostgreSQL row models
//!
//! Conversions between vault table rows and domain types.

use crate::domain::{
    DependentId, ResourceId, ResourceType, Result, StoreError, VaultDocumentId, VaultEntryId,
};
use crate::vault::models::{
    EntityType, StructuredPhiPayload, StructuredVaultDocument, UnstructuredVaultEntry,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio_postgres::Row;

/// Columns selected for unstructured entries
pub const ENTRY_COLUMNS: &str =
    "id, dependent_id, resource_type, resource_id, field_path, value, phi_type, created_at, updated_at";

/// Columns selected for structured documents
pub const DOCUMENT_COLUMNS: &str = "id, dependent_id, phi, created_at, updated_at";

/// Hex SHA-256 of a vaulted value, the indexed part of the dedup key
pub fn value_digest(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn decode<T>(
    field: &str,
    raw: String,
    parse: impl FnOnce(String) -> std::result::Result<T, String>,
) -> Result<T> {
    parse(raw).map_err(|e| {
        StoreError::DeserializationFailed(format!("Invalid {field} in vault row: {e}")).into()
    })
}

/// Row of `phi_vault_entries`
#[derive(Clone)]
pub struct PostgreSQLVaultEntry {
    pub id: String,
    pub dependent_id: String,
    pub resource_type: String,
    pub resource_id: String,
    pub field_path: String,
    pub value: String,
    pub phi_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PostgreSQLVaultEntry {
    pub fn from_row(row: &Row) -> Result<Self> {
        let get = |e: tokio_postgres::Error| {
            StoreError::DeserializationFailed(format!("Unexpected vault entry row: {e}"))
        };
        Ok(Self {
            id: row.try_get("id").map_err(get)?,
            dependent_id: row.try_get("dependent_id").map_err(get)?,
            resource_type: row.try_get("resource_type").map_err(get)?,
            resource_id: row.try_get("resource_id").map_err(get)?,
            field_path: row.try_get("field_path").map_err(get)?,
            value: row.try_get("value").map_err(get)?,
            phi_type: row.try_get("phi_type").map_err(get)?,
            created_at: row.try_get("created_at").map_err(get)?,
            updated_at: row.try_get("updated_at").map_err(get)?,
        })
    }

    /// Convert to the domain entry
    pub fn to_domain(self) -> Result<UnstructuredVaultEntry> {
        Ok(UnstructuredVaultEntry {
            id: decode("id", self.id, VaultEntryId::new)?,
            dependent_id: decode("dependent_id", self.dependent_id, DependentId::new)?,
            resource_type: decode("resource_type", self.resource_type, ResourceType::new)?,
            resource_id: decode("resource_id", self.resource_id, ResourceId::new)?,
            field_path: self.field_path,
            value: self.value,
            phi_type: decode("phi_type", self.phi_type, EntityType::new)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Row of `structured_phi_vaults`
#[derive(Clone)]
pub struct PostgreSQLStructuredVault {
    pub id: String,
    pub dependent_id: String,
    pub phi: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PostgreSQLStructuredVault {
    pub fn from_row(row: &Row) -> Result<Self> {
        let get = |e: tokio_postgres::Error| {
            StoreError::DeserializationFailed(format!("Unexpected structured vault row: {e}"))
        };
        Ok(Self {
            id: row.try_get("id").map_err(get)?,
            dependent_id: row.try_get("dependent_id").map_err(get)?,
            phi: row.try_get("phi").map_err(get)?,
            created_at: row.try_get("created_at").map_err(get)?,
            updated_at: row.try_get("updated_at").map_err(get)?,
        })
    }

    /// Convert to the domain document
    pub fn to_domain(self) -> Result<StructuredVaultDocument> {
        let phi: StructuredPhiPayload = serde_json::from_value(self.phi).map_err(|_| {
            StoreError::DeserializationFailed(format!(
                "Structured vault {} has an invalid phi column",
                self.id
            ))
        })?;
        Ok(StructuredVaultDocument {
            id: decode("id", self.id, VaultDocumentId::new)?,
            dependent_id: decode("dependent_id", self.dependent_id, DependentId::new)?,
            phi,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// JSONB body written for a partial structured update
///
/// Absent fields are omitted so that `phi || $body` leaves them unchanged.
pub fn payload_to_jsonb(payload: &StructuredPhiPayload) -> Result<Value> {
    serde_json::to_value(payload).map_err(|e| {
        StoreError::WriteFailed(format!("Failed to encode structured payload: {e}")).into()
    })
}
