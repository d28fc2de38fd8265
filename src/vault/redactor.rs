//! Token substitution for one field
//!
//! Each distinct `(value, entity_type)` among the spans becomes one vault
//! entry. All entries of the field are written with a single bulk store call
//! before any substitution happens, so a store failure leaves the text
//! untouched and is returned to the caller.

use super::models::{EntityType, FieldContext, NewPhiEntry, Span};
use super::token::VaultToken;
use crate::adapters::database::PhiVaultStore;
use crate::domain::{PhiVaultError, Result, StoreError, VaultEntryId};
use std::collections::HashMap;

/// Sanitized text of one field and the entries it references
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedactedField {
    pub text: String,
    pub entry_ids: Vec<VaultEntryId>,
}

/// Vaults every span of `text` and substitutes tokens in its place
///
/// `spans` must be non-overlapping and sorted descending by start, as
/// produced by [`filter_spans`](super::filter::filter_spans).
///
/// # Errors
///
/// Returns the store error if the bulk upsert fails, or a validation error if
/// a span does not fit `text`.
pub async fn redact_field(
    store: &dyn PhiVaultStore,
    text: &str,
    spans: &[Span],
    ctx: &FieldContext,
) -> Result<RedactedField> {
    if spans.is_empty() {
        return Ok(RedactedField {
            text: text.to_string(),
            entry_ids: Vec::new(),
        });
    }

    let mut slots: HashMap<(&str, &EntityType), usize> = HashMap::new();
    let mut new_entries: Vec<NewPhiEntry> = Vec::new();
    let mut span_slots: Vec<usize> = Vec::with_capacity(spans.len());

    let mut last_start = usize::MAX;
    for span in spans {
        if span.end > last_start {
            return Err(PhiVaultError::Validation(format!(
                "Spans for field {} overlap or are not sorted descending",
                ctx.field_path
            )));
        }
        last_start = span.start;

        let value = text.get(span.start..span.end).ok_or_else(|| {
            PhiVaultError::Validation(format!(
                "Span {}..{} does not fit field {}",
                span.start, span.end, ctx.field_path
            ))
        })?;
        let slot = *slots.entry((value, &span.entity_type)).or_insert_with(|| {
            new_entries.push(NewPhiEntry::for_field(ctx, value, span.entity_type.clone()));
            new_entries.len() - 1
        });
        span_slots.push(slot);
    }

    let ids = store.upsert_phi_entries(&new_entries).await?;
    if ids.len() != new_entries.len() {
        return Err(StoreError::WriteFailed(format!(
            "Store returned {} ids for {} entries",
            ids.len(),
            new_entries.len()
        ))
        .into());
    }

    // Right to left, so earlier offsets stay valid.
    let mut sanitized = text.to_string();
    for (span, &slot) in spans.iter().zip(&span_slots) {
        let token = VaultToken::new(span.entity_type.clone(), ids[slot].clone());
        sanitized.replace_range(span.start..span.end, &token.to_string());
    }

    Ok(RedactedField {
        text: sanitized,
        entry_ids: ids,
    })
}
