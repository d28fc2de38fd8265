//! Vault data models
//!
//! Types shared by the detector, redactor, reconstructor and the store
//! adapters. `Debug` output of every type that carries a raw PHI value is
//! redacted so values cannot reach logs through `{:?}`.

use crate::domain::{DependentId, ResourceId, ResourceType, VaultDocumentId, VaultEntryId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

const REDACTED: &str = "[REDACTED]";

/// Entity type label attached to a detected span, e.g. `PERSON`
///
/// Labels are upper-case `[A-Z][A-Z0-9_]*` so that they can be embedded in a
/// vault token without escaping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityType(String);

impl EntityType {
    pub const PERSON: &'static str = "PERSON";
    pub const PHONE_NUMBER: &'static str = "PHONE_NUMBER";
    pub const ADDRESS: &'static str = "ADDRESS";
    pub const EMAIL_ADDRESS: &'static str = "EMAIL_ADDRESS";
    pub const DATE_TIME: &'static str = "DATE_TIME";
    pub const ID: &'static str = "ID";

    /// Normalizes a label to upper case and validates it
    pub fn new(label: impl AsRef<str>) -> Result<Self, String> {
        let label = label.as_ref().trim().to_ascii_uppercase();
        let mut chars = label.chars();
        let valid_head = matches!(chars.next(), Some('A'..='Z'));
        let valid_tail = chars.all(|c| matches!(c, 'A'..='Z' | '0'..='9' | '_'));
        if !valid_head || !valid_tail {
            return Err(format!("Invalid entity type label: '{label}'"));
        }
        Ok(Self(label))
    }

    /// Returns the label
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for EntityType {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<EntityType> for String {
    fn from(t: EntityType) -> Self {
        t.0
    }
}

/// One detected PHI occurrence inside a string
///
/// `start` and `end` are byte offsets into the analyzed text and always fall
/// on char boundaries.
#[derive(Clone, PartialEq)]
pub struct Span {
    /// Start byte offset (inclusive)
    pub start: usize,
    /// End byte offset (exclusive)
    pub end: usize,
    /// Analyzer confidence (0.0 - 1.0)
    pub score: f32,
    /// Entity type label
    pub entity_type: EntityType,
    /// Matched substring, `text[start..end]`
    pub text: String,
}

impl Span {
    /// Length of the span in bytes
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the span is empty
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether two spans share at least one byte
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Span")
            .field("start", &self.start)
            .field("end", &self.end)
            .field("score", &self.score)
            .field("entity_type", &self.entity_type)
            .field("text", &REDACTED)
            .finish()
    }
}

/// How a declared PHI field is scanned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedactionStrategy {
    /// Replace each detected substring with a vault token
    #[default]
    SubstringRedaction,
}

/// Declares one payload field to scan for PHI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhiFieldSpec {
    /// Dot-separated path into the payload, e.g. `note` or `notes.text`
    pub path: String,

    /// Scanning strategy
    #[serde(default)]
    pub strategy: RedactionStrategy,
}

impl PhiFieldSpec {
    /// Field spec with the default substring-redaction strategy
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            strategy: RedactionStrategy::SubstringRedaction,
        }
    }
}

/// Identifies the field a span was found in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldContext {
    pub resource_type: ResourceType,
    pub resource_id: ResourceId,
    pub dependent_id: DependentId,
    pub field_path: String,
}

/// Deduplication key of an unstructured vault entry
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub dependent_id: DependentId,
    pub resource_id: ResourceId,
    pub field_path: String,
    pub value: String,
    pub phi_type: EntityType,
}

impl fmt::Debug for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DedupKey")
            .field("dependent_id", &self.dependent_id)
            .field("resource_id", &self.resource_id)
            .field("field_path", &self.field_path)
            .field("value", &REDACTED)
            .field("phi_type", &self.phi_type)
            .finish()
    }
}

/// An entry to be find-or-created by the store
#[derive(Clone, PartialEq, Eq)]
pub struct NewPhiEntry {
    pub dependent_id: DependentId,
    pub resource_type: ResourceType,
    pub resource_id: ResourceId,
    pub field_path: String,
    pub value: String,
    pub phi_type: EntityType,
}

impl NewPhiEntry {
    /// Builds an entry for a value found in the given field
    pub fn for_field(ctx: &FieldContext, value: impl Into<String>, phi_type: EntityType) -> Self {
        Self {
            dependent_id: ctx.dependent_id.clone(),
            resource_type: ctx.resource_type.clone(),
            resource_id: ctx.resource_id.clone(),
            field_path: ctx.field_path.clone(),
            value: value.into(),
            phi_type,
        }
    }

    /// The tuple this entry is deduplicated on
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            dependent_id: self.dependent_id.clone(),
            resource_id: self.resource_id.clone(),
            field_path: self.field_path.clone(),
            value: self.value.clone(),
            phi_type: self.phi_type.clone(),
        }
    }
}

impl fmt::Debug for NewPhiEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewPhiEntry")
            .field("dependent_id", &self.dependent_id)
            .field("resource_type", &self.resource_type)
            .field("resource_id", &self.resource_id)
            .field("field_path", &self.field_path)
            .field("value", &REDACTED)
            .field("phi_type", &self.phi_type)
            .finish()
    }
}

/// A persisted free-text PHI occurrence
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct UnstructuredVaultEntry {
    pub id: VaultEntryId,
    pub dependent_id: DependentId,
    pub resource_type: ResourceType,
    pub resource_id: ResourceId,
    pub field_path: String,
    pub value: String,
    pub phi_type: EntityType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UnstructuredVaultEntry {
    /// Materializes a new entry with a fresh id
    pub fn create(entry: &NewPhiEntry, now: DateTime<Utc>) -> Self {
        Self {
            id: VaultEntryId::generate(),
            dependent_id: entry.dependent_id.clone(),
            resource_type: entry.resource_type.clone(),
            resource_id: entry.resource_id.clone(),
            field_path: entry.field_path.clone(),
            value: entry.value.clone(),
            phi_type: entry.phi_type.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    /// The tuple this entry is deduplicated on
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            dependent_id: self.dependent_id.clone(),
            resource_id: self.resource_id.clone(),
            field_path: self.field_path.clone(),
            value: self.value.clone(),
            phi_type: self.phi_type.clone(),
        }
    }
}

impl fmt::Debug for UnstructuredVaultEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnstructuredVaultEntry")
            .field("id", &self.id)
            .field("dependent_id", &self.dependent_id)
            .field("resource_type", &self.resource_type)
            .field("resource_id", &self.resource_id)
            .field("field_path", &self.field_path)
            .field("value", &REDACTED)
            .field("phi_type", &self.phi_type)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Demographic PHI fields, all optional
///
/// Used both as the body of a [`StructuredVaultDocument`] and as a partial
/// update: present fields overwrite, absent fields are left unchanged.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredPhiPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship_note: Option<String>,
}

impl StructuredPhiPayload {
    /// Whether no field is set
    pub fn is_empty(&self) -> bool {
        self.present_fields().is_empty()
    }

    /// Names of the fields that are set (safe to log)
    pub fn present_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.legal_name.is_some() {
            fields.push("legalName");
        }
        if self.date_of_birth.is_some() {
            fields.push("dateOfBirth");
        }
        if self.birth_year.is_some() {
            fields.push("birthYear");
        }
        if self.sex.is_some() {
            fields.push("sex");
        }
        if self.contact.is_some() {
            fields.push("contact");
        }
        if self.address.is_some() {
            fields.push("address");
        }
        if self.preferred_name.is_some() {
            fields.push("preferredName");
        }
        if self.relationship_note.is_some() {
            fields.push("relationshipNote");
        }
        fields
    }

    /// Overwrites fields of `self` with the fields present in `update`
    pub fn merge(&mut self, update: StructuredPhiPayload) {
        if update.legal_name.is_some() {
            self.legal_name = update.legal_name;
        }
        if update.date_of_birth.is_some() {
            self.date_of_birth = update.date_of_birth;
        }
        if update.birth_year.is_some() {
            self.birth_year = update.birth_year;
        }
        if update.sex.is_some() {
            self.sex = update.sex;
        }
        if update.contact.is_some() {
            self.contact = update.contact;
        }
        if update.address.is_some() {
            self.address = update.address;
        }
        if update.preferred_name.is_some() {
            self.preferred_name = update.preferred_name;
        }
        if update.relationship_note.is_some() {
            self.relationship_note = update.relationship_note;
        }
    }
}

impl fmt::Debug for StructuredPhiPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructuredPhiPayload")
            .field("present_fields", &self.present_fields())
            .finish()
    }
}

/// Per-dependent demographic vault document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredVaultDocument {
    pub id: VaultDocumentId,
    pub dependent_id: DependentId,
    #[serde(flatten)]
    pub phi: StructuredPhiPayload,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StructuredVaultDocument {
    /// Creates a new document for a dependent
    pub fn create(
        dependent_id: DependentId,
        phi: StructuredPhiPayload,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: VaultDocumentId::generate(),
            dependent_id,
            phi,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Coarse demographic summary that is safe to expose
///
/// Contains nothing that identifies the dependent on its own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeidentifiedProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_band: Option<String>,
}
