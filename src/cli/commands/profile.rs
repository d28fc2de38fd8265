//! Profile command implementation
//!
//! This module implements the `profile` command, which prints the
//! de-identified demographic profile of a dependent.

use super::{load_or_report, open_engine, report, EXIT_OK, EXIT_VALIDATION};
use crate::domain::DependentId;
use chrono::{NaiveDate, Utc};
use clap::Args;

/// Arguments for the profile command
#[derive(Args, Debug)]
pub struct ProfileArgs {
    /// Dependent to summarize
    #[arg(long)]
    pub dependent_id: String,

    /// Reference date for the age band (YYYY-MM-DD, defaults to today)
    #[arg(long)]
    pub as_of: Option<NaiveDate>,
}

impl ProfileArgs {
    /// Execute the profile command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = match load_or_report(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        let dependent_id = match DependentId::new(self.dependent_id.as_str()) {
            Ok(id) => id,
            Err(e) => {
                eprintln!("❌ Invalid dependent id: {e}");
                return Ok(EXIT_VALIDATION);
            }
        };

        let engine = match open_engine(&config).await {
            Ok(engine) => engine,
            Err(code) => return Ok(code),
        };

        let as_of = self.as_of.unwrap_or_else(|| Utc::now().date_naive());
        match engine
            .get_deidentified_profile_as_of(&dependent_id, as_of)
            .await
        {
            Ok(Some(profile)) => {
                println!("{}", serde_json::to_string_pretty(&profile)?);
                Ok(EXIT_OK)
            }
            Ok(None) => {
                eprintln!("No structured vault for dependent {dependent_id}");
                Ok(EXIT_OK)
            }
            Err(e) => Ok(report("Profile lookup", &e)),
        }
    }
}
