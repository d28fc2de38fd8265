//! Span filtering
//!
//! Narrows detector output before redaction: optional known-identifier gate,
//! removal of spans touching existing vault tokens, and overlap resolution.

use super::models::Span;
use super::token::find_tokens;
use crate::domain::{PhiVaultError, Result};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::ops::Range;

/// Caller-supplied allow-list of identifier strings
///
/// When non-empty, only spans whose exact text is listed are vaulted.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct KnownIdentifiers {
    values: HashSet<String>,
}

impl KnownIdentifiers {
    /// Builds the list, rejecting blank entries
    pub fn new(values: Vec<String>) -> Result<Self> {
        if let Some(pos) = values.iter().position(|v| v.trim().is_empty()) {
            return Err(PhiVaultError::Validation(format!(
                "Known identifier at index {pos} is blank"
            )));
        }
        Ok(Self {
            values: values.into_iter().collect(),
        })
    }

    /// Parses a JSON array of non-blank strings
    ///
    /// # Errors
    ///
    /// Returns [`PhiVaultError::Validation`] for anything other than an array
    /// of strings, or if any string is blank.
    pub fn from_json(value: &Value) -> Result<Self> {
        let items = value.as_array().ok_or_else(|| {
            PhiVaultError::Validation("Known identifiers must be a JSON array".to_string())
        })?;

        let values = items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    PhiVaultError::Validation(format!(
                        "Known identifier at index {i} is not a string"
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(values)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains(&self, candidate: &str) -> bool {
        self.values.contains(candidate)
    }
}

impl std::fmt::Debug for KnownIdentifiers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnownIdentifiers")
            .field("len", &self.values.len())
            .finish()
    }
}

/// Filters `spans` detected in `text`
///
/// Returns non-overlapping spans sorted descending by start, ready for
/// right-to-left substitution.
pub fn filter_spans(
    text: &str,
    spans: Vec<Span>,
    known_identifiers: Option<&KnownIdentifiers>,
) -> Vec<Span> {
    let gate = known_identifiers.filter(|k| !k.is_empty());
    let token_ranges: Vec<Range<usize>> = find_tokens(text).map(|t| t.range).collect();

    let candidates: Vec<Span> = spans
        .into_iter()
        .filter(|span| match gate {
            Some(known) => text
                .get(span.start..span.end)
                .is_some_and(|s| known.contains(s)),
            None => true,
        })
        .filter(|span| {
            !token_ranges
                .iter()
                .any(|r| span.start < r.end && r.start < span.end)
        })
        .collect();

    let mut kept = resolve_overlaps(candidates);
    kept.sort_by(|a, b| b.start.cmp(&a.start));
    kept
}

/// Keeps the winner of every overlapping group
///
/// Higher score wins, then the longer span, then the earlier start.
fn resolve_overlaps(mut spans: Vec<Span>) -> Vec<Span> {
    spans.sort_by(priority);

    let mut kept: Vec<Span> = Vec::with_capacity(spans.len());
    for span in spans {
        if !kept.iter().any(|k| k.overlaps(&span)) {
            kept.push(span);
        }
    }
    kept
}

fn priority(a: &Span, b: &Span) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.len().cmp(&a.len()))
        .then_with(|| a.start.cmp(&b.start))
}
