//! PHI detection, vaulting and reconstruction.
//!
//! # Write path
//!
//! ```text
//! record -> declared PHI fields -> Detector -> filter_spans -> redact_field -> store
//!        -> sanitized record
//! ```
//!
//! Each detected value is stored once per
//! `(dependent, resource, field, value, entity type)` and replaced in the text
//! by a token of the form `phi:vault:<ENTITY_TYPE>:<24-hex-id>`.
//!
//! # Read path
//!
//! Entries for a set of resources are fetched in bulk and
//! [`reconstruct::resolve_value`] swaps tokens back for values inside string
//! leaves only.
//!
//! Demographic fields of dependents take a separate route: they are split off
//! with [`structured::separate_phi_payload`], kept in one structured vault
//! document per dependent, and exposed only through
//! [`profile::derive_profile`].

pub mod detector;
pub mod engine;
pub mod filter;
pub mod models;
pub mod profile;
pub mod reconstruct;
pub mod redactor;
pub mod structured;
pub mod token;

pub use detector::{AnalyzerFinding, Detector, HttpAnalyzer, PhiAnalyzer};
pub use engine::PhiVaultEngine;
pub use filter::{filter_spans, KnownIdentifiers};
pub use models::{
    DeidentifiedProfile, EntityType, FieldContext, NewPhiEntry, PhiFieldSpec, RedactionStrategy,
    Span, StructuredPhiPayload, StructuredVaultDocument, UnstructuredVaultEntry,
};
pub use reconstruct::{EntryIndex, Resolution, ResolvedRecords, UnresolvedTokenPolicy};
pub use structured::SeparatedPayload;
pub use token::{VaultToken, TOKEN_PREFIX};
