//! Token reconstruction
//!
//! Replaces vault tokens with the values they stand for, using entries that
//! were fetched in bulk beforehand. Works on plain strings and on JSON trees;
//! in a tree only string leaves are touched.

use super::models::UnstructuredVaultEntry;
use super::token::find_tokens;
use crate::domain::VaultEntryId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Replacement text for unresolved tokens under [`UnresolvedTokenPolicy::Mask`]
pub const MASK: &str = "[REDACTED]";

/// What to do with a token whose entry is not available
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedTokenPolicy {
    /// Leave the literal token in place
    #[default]
    PassThrough,
    /// Replace the token with `[REDACTED]`
    Mask,
}

/// Entries keyed by id
#[derive(Debug, Default, Clone)]
pub struct EntryIndex {
    entries: HashMap<VaultEntryId, UnstructuredVaultEntry>,
}

impl EntryIndex {
    pub fn new(entries: Vec<UnstructuredVaultEntry>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.id.clone(), e)).collect(),
        }
    }

    pub fn get(&self, id: &VaultEntryId) -> Option<&UnstructuredVaultEntry> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<UnstructuredVaultEntry> for EntryIndex {
    fn from_iter<I: IntoIterator<Item = UnstructuredVaultEntry>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Result of resolving one string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub text: String,
    /// Tokens that had no entry in the index
    pub unresolved: usize,
}

/// Result of reconstructing a batch of records
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRecords {
    pub records: Vec<Value>,
    /// Tokens across all records that had no entry in the index
    pub unresolved: usize,
}

/// Replaces every resolvable token in `text`
pub fn resolve_string(
    text: &str,
    entries: &EntryIndex,
    policy: UnresolvedTokenPolicy,
) -> Resolution {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    let mut unresolved = 0;

    for found in find_tokens(text) {
        out.push_str(&text[cursor..found.range.start]);
        match entries.get(&found.token.entry_id) {
            Some(entry) => out.push_str(&entry.value),
            None => {
                unresolved += 1;
                match policy {
                    UnresolvedTokenPolicy::PassThrough => out.push_str(&text[found.range.clone()]),
                    UnresolvedTokenPolicy::Mask => out.push_str(MASK),
                }
            }
        }
        cursor = found.range.end;
    }
    out.push_str(&text[cursor..]);

    Resolution {
        text: out,
        unresolved,
    }
}

/// Resolves tokens in every string leaf of `value` in place
///
/// Object keys, element order and non-string leaves are left as they are.
/// Returns the number of unresolved tokens.
pub fn resolve_value(
    value: &mut Value,
    entries: &EntryIndex,
    policy: UnresolvedTokenPolicy,
) -> usize {
    match value {
        Value::String(s) => {
            if find_tokens(s).next().is_none() {
                return 0;
            }
            let resolution = resolve_string(s, entries, policy);
            *s = resolution.text;
            resolution.unresolved
        }
        Value::Array(items) => items
            .iter_mut()
            .map(|item| resolve_value(item, entries, policy))
            .sum(),
        Value::Object(map) => map
            .values_mut()
            .map(|item| resolve_value(item, entries, policy))
            .sum(),
        Value::Null | Value::Bool(_) | Value::Number(_) => 0,
    }
}
