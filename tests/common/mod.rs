//! Shared fixtures for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use phivault::adapters::database::PhiVaultStore;
use phivault::adapters::memory::MemoryVaultStore;
use phivault::config::DetectorConfig;
use phivault::domain::{
    DependentId, DetectorError, ResourceId, ResourceType, Result, StoreError, VaultDocumentId,
    VaultEntryId,
};
use phivault::vault::{
    AnalyzerFinding, Detector, NewPhiEntry, PhiAnalyzer, PhiVaultEngine, StructuredPhiPayload,
    StructuredVaultDocument, UnstructuredVaultEntry,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Flags every occurrence of a fixed set of needles
#[derive(Default)]
pub struct NeedleAnalyzer {
    needles: Vec<(String, String, f32)>,
    calls: AtomicUsize,
}

impl NeedleAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, needle: &str, entity_type: &str, score: f32) -> Self {
        self.needles
            .push((needle.to_string(), entity_type.to_string(), score));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PhiAnalyzer for NeedleAnalyzer {
    async fn analyze_text(
        &self,
        text: &str,
    ) -> std::result::Result<Vec<AnalyzerFinding>, DetectorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut findings = Vec::new();
        for (needle, entity_type, score) in &self.needles {
            for (start, _) in text.match_indices(needle.as_str()) {
                findings.push(AnalyzerFinding {
                    entity_type: entity_type.clone(),
                    start,
                    end: start + needle.len(),
                    score: *score,
                });
            }
        }
        Ok(findings)
    }

    fn name(&self) -> &str {
        "needle"
    }
}

/// Store whose writes always fail
#[derive(Default)]
pub struct FailingWriteStore {
    pub write_attempts: AtomicUsize,
}

impl FailingWriteStore {
    fn fail<T>(&self) -> Result<T> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::WriteFailed("disk full".to_string()).into())
    }
}

#[async_trait]
impl PhiVaultStore for FailingWriteStore {
    async fn upsert_phi_entries(&self, _entries: &[NewPhiEntry]) -> Result<Vec<VaultEntryId>> {
        self.fail()
    }

    async fn get_unstructured_phi_vault_entries(
        &self,
        _resource_ids: &[ResourceId],
    ) -> Result<Vec<UnstructuredVaultEntry>> {
        Ok(Vec::new())
    }

    async fn upsert_structured_phi_vault(
        &self,
        _dependent_id: &DependentId,
        _payload: &StructuredPhiPayload,
        _existing_vault_id: Option<&VaultDocumentId>,
    ) -> Result<VaultDocumentId> {
        self.fail()
    }

    async fn get_structured_phi_vault(
        &self,
        _id: &VaultDocumentId,
    ) -> Result<Option<StructuredVaultDocument>> {
        Ok(None)
    }

    async fn get_structured_phi_vaults(
        &self,
        _ids: &[VaultDocumentId],
    ) -> Result<HashMap<VaultDocumentId, StructuredVaultDocument>> {
        Ok(HashMap::new())
    }

    async fn get_structured_phi_vault_by_dependent_id(
        &self,
        _dependent_id: &DependentId,
    ) -> Result<Option<StructuredVaultDocument>> {
        Ok(None)
    }

    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    async fn ensure_schema(&self) -> Result<()> {
        Ok(())
    }

    fn store_name(&self) -> &str {
        "failing"
    }
}

/// Engine over a fresh in-memory store
pub fn memory_engine(analyzer: NeedleAnalyzer) -> (PhiVaultEngine, Arc<MemoryVaultStore>) {
    let store = Arc::new(MemoryVaultStore::new());
    let detector = Detector::new(Arc::new(analyzer), &DetectorConfig::default());
    (PhiVaultEngine::new(detector, store.clone()), store)
}

/// Resource type, resource id and dependent id of a note
pub fn note_ids(resource_id: &str) -> (ResourceType, ResourceId, DependentId) {
    (
        ResourceType::new("Note").unwrap(),
        ResourceId::new(resource_id).unwrap(),
        DependentId::new("dep-1").unwrap(),
    )
}
