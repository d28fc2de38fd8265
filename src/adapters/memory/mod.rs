//! In-memory vault store
//!
//! Holds all vault data behind one async mutex, so every trait method is a
//! single critical section. Used by tests, the CLI `memory` target and local
//! runs; nothing survives the process.

use crate::adapters::database::traits::PhiVaultStore;
use crate::domain::{
    DependentId, ResourceId, Result, StoreError, VaultDocumentId, VaultEntryId,
};
use crate::vault::models::{
    DedupKey, NewPhiEntry, StructuredPhiPayload, StructuredVaultDocument, UnstructuredVaultEntry,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;

#[derive(Default)]
struct VaultState {
    entries: Vec<UnstructuredVaultEntry>,
    entry_index: HashMap<DedupKey, usize>,
    documents: HashMap<VaultDocumentId, StructuredVaultDocument>,
    document_by_dependent: HashMap<DependentId, VaultDocumentId>,
}

/// Vault store backed by process memory
#[derive(Default)]
pub struct MemoryVaultStore {
    state: Mutex<VaultState>,
}

impl MemoryVaultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of unstructured entries held
    pub async fn entry_count(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    /// Number of structured documents held
    pub async fn document_count(&self) -> usize {
        self.state.lock().await.documents.len()
    }
}

#[async_trait]
impl PhiVaultStore for MemoryVaultStore {
    async fn upsert_phi_entries(&self, entries: &[NewPhiEntry]) -> Result<Vec<VaultEntryId>> {
        let now = Utc::now();
        let mut state = self.state.lock().await;
        let mut ids = Vec::with_capacity(entries.len());

        for entry in entries {
            let key = entry.dedup_key();
            if let Some(&pos) = state.entry_index.get(&key) {
                let existing = &mut state.entries[pos];
                existing.updated_at = now;
                ids.push(existing.id.clone());
                continue;
            }

            let created = UnstructuredVaultEntry::create(entry, now);
            ids.push(created.id.clone());
            let pos = state.entries.len();
            state.entries.push(created);
            state.entry_index.insert(key, pos);
        }

        Ok(ids)
    }

    async fn get_unstructured_phi_vault_entries(
        &self,
        resource_ids: &[ResourceId],
    ) -> Result<Vec<UnstructuredVaultEntry>> {
        let wanted: HashSet<&ResourceId> = resource_ids.iter().collect();
        let state = self.state.lock().await;
        Ok(state
            .entries
            .iter()
            .filter(|e| wanted.contains(&e.resource_id))
            .cloned()
            .collect())
    }

    async fn upsert_structured_phi_vault(
        &self,
        dependent_id: &DependentId,
        payload: &StructuredPhiPayload,
        existing_vault_id: Option<&VaultDocumentId>,
    ) -> Result<VaultDocumentId> {
        let now = Utc::now();
        let mut state = self.state.lock().await;

        let target = match existing_vault_id {
            Some(id) => {
                let owned = state
                    .documents
                    .get(id)
                    .is_some_and(|doc| &doc.dependent_id == dependent_id);
                if !owned {
                    return Err(StoreError::DocumentNotFound(format!(
                        "Structured vault {id} for dependent {dependent_id}"
                    ))
                    .into());
                }
                Some(id.clone())
            }
            None => state.document_by_dependent.get(dependent_id).cloned(),
        };

        if let Some(id) = target {
            if let Some(doc) = state.documents.get_mut(&id) {
                doc.phi.merge(payload.clone());
                doc.updated_at = now;
                return Ok(id);
            }
        }

        let doc = StructuredVaultDocument::create(dependent_id.clone(), payload.clone(), now);
        let id = doc.id.clone();
        state
            .document_by_dependent
            .insert(dependent_id.clone(), id.clone());
        state.documents.insert(id.clone(), doc);
        Ok(id)
    }

    async fn get_structured_phi_vault(
        &self,
        id: &VaultDocumentId,
    ) -> Result<Option<StructuredVaultDocument>> {
        Ok(self.state.lock().await.documents.get(id).cloned())
    }

    async fn get_structured_phi_vaults(
        &self,
        ids: &[VaultDocumentId],
    ) -> Result<HashMap<VaultDocumentId, StructuredVaultDocument>> {
        let state = self.state.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.documents.get(id).map(|d| (id.clone(), d.clone())))
            .collect())
    }

    async fn get_structured_phi_vault_by_dependent_id(
        &self,
        dependent_id: &DependentId,
    ) -> Result<Option<StructuredVaultDocument>> {
        let state = self.state.lock().await;
        Ok(state
            .document_by_dependent
            .get(dependent_id)
            .and_then(|id| state.documents.get(id))
            .cloned())
    }

    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    async fn ensure_schema(&self) -> Result<()> {
        Ok(())
    }

    fn store_name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PhiVaultError, ResourceType};
    use crate::vault::models::{EntityType, FieldContext};
    use std::sync::Arc;

    fn ctx(resource: &str) -> FieldContext {
        FieldContext {
            resource_type: ResourceType::new("Note").unwrap(),
            resource_id: ResourceId::new(resource).unwrap(),
            dependent_id: DependentId::new("dep-1").unwrap(),
            field_path: "note".to_string(),
        }
    }

    fn person(ctx: &FieldContext, value: &str) -> NewPhiEntry {
        NewPhiEntry::for_field(ctx, value, EntityType::new(EntityType::PERSON).unwrap())
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let store = MemoryVaultStore::new();
        let ctx = ctx("res-1");

        let first = store
            .upsert_phi_entries(&[person(&ctx, "John Doe")])
            .await
            .unwrap();
        let second = store
            .upsert_phi_entries(&[person(&ctx, "John Doe")])
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(store.entry_count().await, 1);
    }

    #[tokio::test]
    async fn test_dedup_key_includes_resource() {
        let store = MemoryVaultStore::new();
        let a = store
            .upsert_phi_entries(&[person(&ctx("res-1"), "John Doe")])
            .await
            .unwrap();
        let b = store
            .upsert_phi_entries(&[person(&ctx("res-2"), "John Doe")])
            .await
            .unwrap();
        assert_ne!(a, b);

        let entries = store
            .get_unstructured_phi_vault_entries(&[ResourceId::new("res-2").unwrap()])
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, b[0]);
    }

    #[tokio::test]
    async fn test_structured_create_then_merge() {
        let store = MemoryVaultStore::new();
        let dep = DependentId::new("dep-1").unwrap();

        let created = store
            .upsert_structured_phi_vault(
                &dep,
                &StructuredPhiPayload {
                    legal_name: Some("Jane Roe".to_string()),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap();
        let updated = store
            .upsert_structured_phi_vault(
                &dep,
                &StructuredPhiPayload {
                    sex: Some("female".to_string()),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap();

        assert_eq!(created, updated);
        let doc = store.get_structured_phi_vault(&created).await.unwrap().unwrap();
        assert_eq!(doc.phi.legal_name.as_deref(), Some("Jane Roe"));
        assert_eq!(doc.phi.sex.as_deref(), Some("female"));
        assert_eq!(store.document_count().await, 1);
    }

    #[tokio::test]
    async fn test_existing_id_of_other_dependent_rejected() {
        let store = MemoryVaultStore::new();
        let owner = DependentId::new("dep-1").unwrap();
        let other = DependentId::new("dep-2").unwrap();
        let payload = StructuredPhiPayload {
            birth_year: Some(1990),
            ..Default::default()
        };

        let id = store
            .upsert_structured_phi_vault(&owner, &payload, None)
            .await
            .unwrap();
        let err = store
            .upsert_structured_phi_vault(&other, &payload, Some(&id))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PhiVaultError::Store(StoreError::DocumentNotFound(_))
        ));

        let missing = VaultDocumentId::generate();
        assert!(store
            .upsert_structured_phi_vault(&owner, &payload, Some(&missing))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_concurrent_first_writes_share_document() {
        let store = Arc::new(MemoryVaultStore::new());
        let dep = DependentId::new("dep-race").unwrap();

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                let dep = dep.clone();
                tokio::spawn(async move {
                    let payload = StructuredPhiPayload {
                        preferred_name: Some(format!("nick-{i}")),
                        ..Default::default()
                    };
                    store
                        .upsert_structured_phi_vault(&dep, &payload, None)
                        .await
                        .unwrap()
                })
            })
            .collect();

        let ids: HashSet<VaultDocumentId> = futures::future::join_all(tasks)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(ids.len(), 1);
        assert_eq!(store.document_count().await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_entry_upserts_share_one_entry() {
        let store = Arc::new(MemoryVaultStore::new());
        let entry = person(&ctx("res-race"), "John Doe");

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                let entry = entry.clone();
                tokio::spawn(async move { store.upsert_phi_entries(&[entry]).await.unwrap() })
            })
            .collect();

        let ids: HashSet<VaultEntryId> = futures::future::join_all(tasks)
            .await
            .into_iter()
            .flat_map(|r| r.unwrap())
            .collect();
        assert_eq!(ids.len(), 1);
        assert_eq!(store.entry_count().await, 1);
    }
}
