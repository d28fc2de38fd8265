//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for phivault using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// phivault - PHI detection and vault tokenization
#[derive(Parser, Debug)]
#[command(name = "phivault")]
#[command(version, about, long_about = None)]
#[command(author = "PHI Vault Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "phivault.toml", env = "PHIVAULT_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "PHIVAULT_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Vault the PHI fields of a JSON record and print the sanitized record
    Sanitize(commands::sanitize::SanitizeArgs),

    /// Replace vault tokens in records or text with the original values
    Resolve(commands::resolve::ResolveArgs),

    /// Print the de-identified profile of a dependent
    Profile(commands::profile::ProfileArgs),

    /// Create the vault schema in the configured store
    Migrate(commands::migrate::MigrateArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_sanitize() {
        let cli = Cli::parse_from([
            "phivault",
            "sanitize",
            "--resource-type",
            "Note",
            "--resource-id",
            "note-1",
            "--dependent-id",
            "dep-1",
            "-f",
            "note",
            "-f",
            "notes.text",
        ]);
        assert_eq!(cli.config, "phivault.toml");
        match cli.command {
            Commands::Sanitize(args) => assert_eq!(args.fields, vec!["note", "notes.text"]),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_with_config() {
        let cli = Cli::parse_from(["phivault", "--config", "custom.toml", "migrate"]);
        assert_eq!(cli.config, "custom.toml");
        assert!(matches!(cli.command, Commands::Migrate(_)));
    }

    #[test]
    fn test_cli_parse_with_log_level() {
        let cli = Cli::parse_from(["phivault", "--log-level", "debug", "validate-config"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_cli_parse_validate_config() {
        let cli = Cli::parse_from(["phivault", "validate-config"]);
        assert!(matches!(cli.command, Commands::ValidateConfig(_)));
    }

    #[test]
    fn test_cli_parse_profile() {
        let cli = Cli::parse_from(["phivault", "profile", "--dependent-id", "dep-1"]);
        assert!(matches!(cli.command, Commands::Profile(_)));
    }

    #[test]
    fn test_cli_sanitize_requires_field() {
        let result = Cli::try_parse_from([
            "phivault",
            "sanitize",
            "--resource-type",
            "Note",
            "--resource-id",
            "note-1",
            "--dependent-id",
            "dep-1",
        ]);
        assert!(result.is_err());
    }
}
