//! Sanitize command implementation
//!
//! This module implements the `sanitize` command, which vaults the declared
//! PHI fields of one JSON record and prints the sanitized record.

use super::{load_or_report, open_engine, read_input, report, EXIT_OK, EXIT_VALIDATION};
use crate::domain::{DependentId, PhiVaultError, ResourceId, ResourceType};
use crate::vault::{KnownIdentifiers, PhiFieldSpec};
use clap::Args;
use serde_json::Value;

/// Arguments for the sanitize command
#[derive(Args, Debug)]
pub struct SanitizeArgs {
    /// JSON record to sanitize ("-" reads stdin)
    #[arg(short, long, default_value = "-")]
    pub input: String,

    /// Resource type of the record, e.g. "Note"
    #[arg(long)]
    pub resource_type: String,

    /// Identifier of the record
    #[arg(long)]
    pub resource_id: String,

    /// Dependent the record belongs to
    #[arg(long)]
    pub dependent_id: String,

    /// Dotted path of a PHI text field (repeatable)
    #[arg(short, long = "field", required = true)]
    pub fields: Vec<String>,

    /// JSON file with an array of the dependent's known identifiers
    #[arg(long)]
    pub known_identifiers: Option<String>,
}

impl SanitizeArgs {
    /// Execute the sanitize command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = match load_or_report(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        let (resource_type, resource_id, dependent_id) = match self.identifiers() {
            Ok(ids) => ids,
            Err(e) => {
                eprintln!("❌ Invalid identifier: {e}");
                return Ok(EXIT_VALIDATION);
            }
        };

        let record: Value = match serde_json::from_str(&read_input(&self.input).await?) {
            Ok(v) => v,
            Err(e) => {
                eprintln!("❌ Input is not valid JSON: {e}");
                return Ok(EXIT_VALIDATION);
            }
        };

        let known = match &self.known_identifiers {
            Some(path) => {
                let raw = read_input(path).await?;
                let parsed = serde_json::from_str::<Value>(&raw)
                    .map_err(PhiVaultError::from)
                    .and_then(|v| KnownIdentifiers::from_json(&v));
                match parsed {
                    Ok(known) => Some(known),
                    Err(e) => return Ok(report("Reading known identifiers", &e)),
                }
            }
            None => None,
        };

        let engine = match open_engine(&config).await {
            Ok(engine) => engine,
            Err(code) => return Ok(code),
        };

        let specs: Vec<PhiFieldSpec> = self.fields.iter().map(PhiFieldSpec::new).collect();
        let sanitized = match engine
            .vault_and_sanitize_fields(
                &resource_type,
                &resource_id,
                &dependent_id,
                &record,
                &specs,
                known.as_ref(),
            )
            .await
        {
            Ok(v) => v,
            Err(e) => return Ok(report("Sanitization", &e)),
        };

        println!("{}", serde_json::to_string_pretty(&sanitized)?);
        Ok(EXIT_OK)
    }

    fn identifiers(&self) -> Result<(ResourceType, ResourceId, DependentId), String> {
        Ok((
            ResourceType::new(self.resource_type.as_str())?,
            ResourceId::new(self.resource_id.as_str())?,
            DependentId::new(self.dependent_id.as_str())?,
        ))
    }
}
