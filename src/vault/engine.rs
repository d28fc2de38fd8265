//! PHI vault engine
//!
//! [`PhiVaultEngine`] is the entry point used by the record store around it.
//! It composes the detector, filter, redactor and reconstructor with an
//! injected [`PhiVaultStore`].
//!
//! # Examples
//!
//! ```no_run
//! use phivault::adapters::memory::MemoryVaultStore;
//! use phivault::config::DetectorConfig;
//! use phivault::domain::{DependentId, ResourceId, ResourceType};
//! use phivault::vault::{Detector, HttpAnalyzer, PhiFieldSpec, PhiVaultEngine};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DetectorConfig::default();
//! let detector = Detector::new(Arc::new(HttpAnalyzer::new(&config)?), &config);
//! let engine = PhiVaultEngine::new(detector, Arc::new(MemoryVaultStore::new()));
//!
//! let sanitized = engine
//!     .vault_and_sanitize_fields(
//!         &ResourceType::new("Note")?,
//!         &ResourceId::new("note-1")?,
//!         &DependentId::new("dep-1")?,
//!         &json!({"note": "Patient John Doe arrived for checkup."}),
//!         &[PhiFieldSpec::new("note")],
//!         None,
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

use super::detector::{Detector, HttpAnalyzer};
use super::filter::{filter_spans, KnownIdentifiers};
use super::models::{
    DeidentifiedProfile, FieldContext, PhiFieldSpec, RedactionStrategy, StructuredPhiPayload,
    StructuredVaultDocument, UnstructuredVaultEntry,
};
use super::profile::derive_profile;
use super::reconstruct::{self, EntryIndex, Resolution, ResolvedRecords, UnresolvedTokenPolicy};
use super::redactor::redact_field;
use super::structured::{self, SeparatedPayload};
use crate::adapters::database::PhiVaultStore;
use crate::config::PhiVaultConfig;
use crate::domain::{
    DependentId, ResourceId, ResourceType, Result, VaultDocumentId,
};
use crate::{log_field_sanitized, log_unresolved_tokens};
use chrono::{NaiveDate, Utc};
use futures::future::try_join_all;
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;

/// One string leaf selected by a field spec
struct FieldLeaf {
    /// Declared path, used as the vault `field_path`
    field_path: String,
    /// JSON pointer of the concrete leaf
    pointer: String,
    text: String,
}

/// PHI vault engine
///
/// Cheap to share behind an `Arc`; all state lives in the store.
pub struct PhiVaultEngine {
    detector: Detector,
    store: Arc<dyn PhiVaultStore>,
    unresolved_policy: UnresolvedTokenPolicy,
}

impl PhiVaultEngine {
    /// Creates an engine with the default unresolved-token policy
    pub fn new(detector: Detector, store: Arc<dyn PhiVaultStore>) -> Self {
        Self {
            detector,
            store,
            unresolved_policy: UnresolvedTokenPolicy::default(),
        }
    }

    /// Builds an engine talking to the configured HTTP analyzer
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the analyzer client cannot be built.
    pub fn from_config(config: &PhiVaultConfig, store: Arc<dyn PhiVaultStore>) -> Result<Self> {
        let analyzer = HttpAnalyzer::new(&config.detector)?;
        let detector = Detector::new(Arc::new(analyzer), &config.detector);
        Ok(Self::new(detector, store)
            .with_unresolved_policy(config.reconstruction.unresolved_tokens))
    }

    /// Sets what happens to tokens whose entry is missing on read
    pub fn with_unresolved_policy(mut self, policy: UnresolvedTokenPolicy) -> Self {
        self.unresolved_policy = policy;
        self
    }

    pub fn store(&self) -> &Arc<dyn PhiVaultStore> {
        &self.store
    }

    pub fn detector(&self) -> &Detector {
        &self.detector
    }

    /// Detects, vaults and tokenizes the declared PHI fields of `payload`
    ///
    /// Works on a copy; the sanitized copy is returned only after every
    /// declared field was analyzed and every vault entry was stored.
    ///
    /// # Errors
    ///
    /// Any detector or store failure aborts the whole call and no sanitized
    /// payload is returned.
    pub async fn vault_and_sanitize_fields(
        &self,
        resource_type: &ResourceType,
        resource_id: &ResourceId,
        dependent_id: &DependentId,
        payload: &Value,
        phi_field_specs: &[PhiFieldSpec],
        known_identifiers: Option<&KnownIdentifiers>,
    ) -> Result<Value> {
        let started = Instant::now();
        let mut sanitized = payload.clone();

        let leaves: Vec<FieldLeaf> = phi_field_specs
            .iter()
            .flat_map(|spec| match spec.strategy {
                RedactionStrategy::SubstringRedaction => select_leaves(&sanitized, &spec.path),
            })
            .collect();

        if leaves.is_empty() {
            tracing::debug!(
                resource_id = %resource_id,
                declared_fields = phi_field_specs.len(),
                "No PHI text fields present"
            );
            return Ok(sanitized);
        }

        let detections =
            try_join_all(leaves.iter().map(|leaf| self.detector.detect(&leaf.text))).await?;

        let mut replacements = Vec::with_capacity(leaves.len());
        let mut entry_total = 0;
        for (leaf, spans) in leaves.iter().zip(detections) {
            let spans = filter_spans(&leaf.text, spans, known_identifiers);
            if spans.is_empty() {
                continue;
            }

            let entity_types: BTreeSet<&str> =
                spans.iter().map(|s| s.entity_type.as_str()).collect();
            let ctx = FieldContext {
                resource_type: resource_type.clone(),
                resource_id: resource_id.clone(),
                dependent_id: dependent_id.clone(),
                field_path: leaf.field_path.clone(),
            };
            let redacted = redact_field(self.store.as_ref(), &leaf.text, &spans, &ctx).await?;

            log_field_sanitized!(resource_id, leaf.pointer, spans.len(), entity_types);
            entry_total += redacted.entry_ids.len();
            replacements.push((leaf.pointer.as_str(), redacted.text));
        }

        for (pointer, text) in replacements {
            if let Some(slot) = sanitized.pointer_mut(pointer) {
                *slot = Value::String(text);
            }
        }

        tracing::info!(
            resource_type = %resource_type,
            resource_id = %resource_id,
            fields = leaves.len(),
            vault_entries = entry_total,
            duration_ms = started.elapsed().as_millis() as u64,
            "Sanitized PHI fields"
        );

        Ok(sanitized)
    }

    /// Bulk-fetches the unstructured entries of a set of resources
    pub async fn get_unstructured_phi_vault_entries(
        &self,
        resource_ids: &[ResourceId],
    ) -> Result<Vec<UnstructuredVaultEntry>> {
        if resource_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.store
            .get_unstructured_phi_vault_entries(resource_ids)
            .await
    }

    /// Replaces tokens in arbitrary text with values from `entries`
    pub fn resolve_string(&self, text: &str, entries: &EntryIndex) -> Resolution {
        let resolution = reconstruct::resolve_string(text, entries, self.unresolved_policy);
        if resolution.unresolved > 0 {
            log_unresolved_tokens!(resolution.unresolved, "text");
        }
        resolution
    }

    /// Fetches the entries of `resource_ids` and resolves tokens in `text`
    pub async fn resolve_text(
        &self,
        text: &str,
        resource_ids: &[ResourceId],
    ) -> Result<Resolution> {
        let entries = EntryIndex::new(self.get_unstructured_phi_vault_entries(resource_ids).await?);
        Ok(self.resolve_string(text, &entries))
    }

    /// Reconstructs records fetched from the primary store
    ///
    /// Entries for all `resource_ids` are fetched with one store call. The
    /// number of tokens left unresolved is returned with the records.
    pub async fn resolve_records(
        &self,
        mut records: Vec<Value>,
        resource_ids: &[ResourceId],
    ) -> Result<ResolvedRecords> {
        let entries = EntryIndex::new(self.get_unstructured_phi_vault_entries(resource_ids).await?);

        let unresolved: usize = records
            .iter_mut()
            .map(|record| reconstruct::resolve_value(record, &entries, self.unresolved_policy))
            .sum();
        if unresolved > 0 {
            log_unresolved_tokens!(unresolved, "records");
        }

        tracing::debug!(
            records = records.len(),
            entries = entries.len(),
            "Reconstructed records"
        );
        Ok(ResolvedRecords {
            records,
            unresolved,
        })
    }

    /// Splits demographic fields from a dependent record
    pub fn separate_phi_payload(&self, record: &Value) -> Result<SeparatedPayload> {
        structured::separate_phi_payload(record)
    }

    /// Creates or merge-updates the demographic vault of a dependent
    pub async fn upsert_structured_phi_vault(
        &self,
        dependent_id: &DependentId,
        payload: &StructuredPhiPayload,
        existing_vault_id: Option<&VaultDocumentId>,
    ) -> Result<VaultDocumentId> {
        let id = self
            .store
            .upsert_structured_phi_vault(dependent_id, payload, existing_vault_id)
            .await?;
        tracing::info!(
            dependent_id = %dependent_id,
            vault_id = %id,
            fields = ?payload.present_fields(),
            "Upserted structured PHI vault"
        );
        Ok(id)
    }

    /// Separates a dependent record and vaults its demographic fields
    ///
    /// Returns the sanitized record and the vault document id, or `None` when
    /// the record carried no demographic fields.
    pub async fn vault_dependent_record(
        &self,
        dependent_id: &DependentId,
        record: &Value,
        existing_vault_id: Option<&VaultDocumentId>,
    ) -> Result<(Map<String, Value>, Option<VaultDocumentId>)> {
        let SeparatedPayload {
            sanitized,
            phi_payload,
        } = self.separate_phi_payload(record)?;

        if phi_payload.is_empty() {
            return Ok((sanitized, existing_vault_id.cloned()));
        }

        let id = self
            .upsert_structured_phi_vault(dependent_id, &phi_payload, existing_vault_id)
            .await?;
        Ok((sanitized, Some(id)))
    }

    pub async fn get_structured_phi_vault(
        &self,
        id: &VaultDocumentId,
    ) -> Result<Option<StructuredVaultDocument>> {
        self.store.get_structured_phi_vault(id).await
    }

    pub async fn get_structured_phi_vaults(
        &self,
        ids: &[VaultDocumentId],
    ) -> Result<HashMap<VaultDocumentId, StructuredVaultDocument>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        self.store.get_structured_phi_vaults(ids).await
    }

    pub async fn get_structured_phi_vault_by_dependent_id(
        &self,
        dependent_id: &DependentId,
    ) -> Result<Option<StructuredVaultDocument>> {
        self.store
            .get_structured_phi_vault_by_dependent_id(dependent_id)
            .await
    }

    /// Safe demographic summary of a dependent, as of today (UTC)
    pub async fn get_deidentified_profile(
        &self,
        dependent_id: &DependentId,
    ) -> Result<Option<DeidentifiedProfile>> {
        self.get_deidentified_profile_as_of(dependent_id, Utc::now().date_naive())
            .await
    }

    /// Safe demographic summary of a dependent as of a given date
    pub async fn get_deidentified_profile_as_of(
        &self,
        dependent_id: &DependentId,
        as_of: NaiveDate,
    ) -> Result<Option<DeidentifiedProfile>> {
        let doc = self
            .get_structured_phi_vault_by_dependent_id(dependent_id)
            .await?;
        Ok(doc.map(|doc| derive_profile(&doc, as_of)))
    }
}

/// Collects the string leaves addressed by a dotted path
///
/// Arrays met on the way, including at the end of the path, are traversed
/// element-wise. Missing keys and non-string leaves are skipped.
fn select_leaves(root: &Value, path: &str) -> Vec<FieldLeaf> {
    let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
    let mut leaves = Vec::new();
    if segments.is_empty() {
        return leaves;
    }
    walk(root, &segments, String::new(), path, &mut leaves);
    leaves
}

fn walk(value: &Value, segments: &[&str], pointer: String, path: &str, out: &mut Vec<FieldLeaf>) {
    match (value, segments.split_first()) {
        (Value::Array(items), _) => {
            for (i, item) in items.iter().enumerate() {
                walk(item, segments, format!("{pointer}/{i}"), path, out);
            }
        }
        (Value::Object(map), Some((head, rest))) => {
            if let Some(child) = map.get(*head) {
                walk(child, rest, format!("{pointer}/{}", escape_pointer(head)), path, out);
            }
        }
        (Value::String(text), None) => out.push(FieldLeaf {
            field_path: path.to_string(),
            pointer,
            text: text.clone(),
        }),
        _ => {}
    }
}

fn escape_pointer(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}
