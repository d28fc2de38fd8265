//! Demographic field separation
//!
//! Splits a dependent record into the part that may be stored in the primary
//! record store and the demographic fields that belong in the structured
//! vault.

use super::models::StructuredPhiPayload;
use crate::domain::{PhiVaultError, Result};
use serde_json::{Map, Value};

/// Keys moved into the structured vault
pub const DEMOGRAPHIC_KEYS: [&str; 8] = [
    "legalName",
    "dateOfBirth",
    "birthYear",
    "sex",
    "contact",
    "address",
    "preferredName",
    "relationshipNote",
];

/// A record split into its sanitized remainder and its demographic fields
#[derive(Debug, Clone, PartialEq)]
pub struct SeparatedPayload {
    pub sanitized: Map<String, Value>,
    pub phi_payload: StructuredPhiPayload,
}

/// Partitions `record` by the demographic key list
///
/// Keys outside the list pass through untouched. A `null` demographic value
/// is removed from the record and treated as absent.
///
/// # Errors
///
/// Returns [`PhiVaultError::Validation`] if `record` is not an object or a
/// demographic value has the wrong type.
pub fn separate_phi_payload(record: &Value) -> Result<SeparatedPayload> {
    let object = record.as_object().ok_or_else(|| {
        PhiVaultError::Validation("Dependent record must be a JSON object".to_string())
    })?;

    let mut sanitized = Map::new();
    let mut phi = Map::new();
    for (key, value) in object {
        if DEMOGRAPHIC_KEYS.contains(&key.as_str()) {
            if !value.is_null() {
                phi.insert(key.clone(), value.clone());
            }
        } else {
            sanitized.insert(key.clone(), value.clone());
        }
    }

    let phi_payload = parse_payload(phi)?;
    tracing::debug!(
        demographic_fields = ?phi_payload.present_fields(),
        passthrough_fields = sanitized.len(),
        "Separated demographic fields"
    );

    Ok(SeparatedPayload {
        sanitized,
        phi_payload,
    })
}

/// Parses a demographic object, naming the offending key on a type mismatch
pub fn parse_payload(phi: Map<String, Value>) -> Result<StructuredPhiPayload> {
    for (key, value) in &phi {
        let ok = match key.as_str() {
            "birthYear" => value.as_i64().is_some_and(|y| i32::try_from(y).is_ok()),
            "contact" | "address" => value.is_object() || value.is_string(),
            _ => value.is_string(),
        };
        if !ok {
            // Only the key and the JSON kind are reported, never the value.
            return Err(PhiVaultError::Validation(format!(
                "Demographic field '{key}' has invalid type {}",
                json_kind(value)
            )));
        }
    }

    // serde_json messages quote the offending value, so they are not forwarded.
    serde_json::from_value(Value::Object(phi))
        .map_err(|_| PhiVaultError::Validation("Invalid demographic payload".to_string()))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
