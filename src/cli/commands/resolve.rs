//! Resolve command implementation
//!
//! This module implements the `resolve` command, which swaps vault tokens in
//! a JSON record (or plain text) back for the original values.

use super::{load_or_report, open_engine, read_input, report, EXIT_OK, EXIT_VALIDATION};
use crate::domain::ResourceId;
use clap::Args;
use serde_json::Value;

/// Arguments for the resolve command
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// JSON record, array of records, or text ("-" reads stdin)
    #[arg(short, long, default_value = "-")]
    pub input: String,

    /// Resource whose vault entries may appear in the input (repeatable)
    #[arg(short, long = "resource-id", required = true)]
    pub resource_ids: Vec<String>,

    /// Treat the input as plain text instead of JSON
    #[arg(long)]
    pub text: bool,
}

impl ResolveArgs {
    /// Execute the resolve command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = match load_or_report(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        let resource_ids = match self
            .resource_ids
            .iter()
            .map(|id| ResourceId::new(id.as_str()))
            .collect::<Result<Vec<_>, _>>()
        {
            Ok(ids) => ids,
            Err(e) => {
                eprintln!("❌ Invalid resource id: {e}");
                return Ok(EXIT_VALIDATION);
            }
        };

        let input = read_input(&self.input).await?;
        let engine = match open_engine(&config).await {
            Ok(engine) => engine,
            Err(code) => return Ok(code),
        };

        if self.text {
            match engine.resolve_text(&input, &resource_ids).await {
                Ok(resolution) => {
                    println!("{}", resolution.text);
                    return Ok(EXIT_OK);
                }
                Err(e) => return Ok(report("Reconstruction", &e)),
            }
        }

        let (records, single) = match serde_json::from_str::<Value>(&input) {
            Ok(Value::Array(records)) => (records, false),
            Ok(record) => (vec![record], true),
            Err(e) => {
                eprintln!("❌ Input is not valid JSON: {e}");
                return Ok(EXIT_VALIDATION);
            }
        };

        let mut resolved = match engine.resolve_records(records, &resource_ids).await {
            Ok(resolved) => resolved.records,
            Err(e) => return Ok(report("Reconstruction", &e)),
        };

        let output = if single {
            resolved.pop().unwrap_or(Value::Null)
        } else {
            Value::Array(resolved)
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(EXIT_OK)
    }
}
