//! CLI definitions for migration-guard
//!
//! This module contains all CLI argument parsing structures using clap.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "migration-guard",
    version,
    about = "Migration safety analyzer for generated database schemas",
    long_about = "Compares the models about to be generated against the stored manifest,\nclassifies every change by risk, and records the new baseline."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (default: <target>/migration-guard.yaml when present)
    #[arg(long, global = true, env = "MIGRATION_GUARD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Abort manifest loads and updates after this long (e.g. "30s", "2m")
    #[arg(long, global = true, value_parser = parse_timeout)]
    pub timeout: Option<Duration>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Classify changes between the models file and the stored manifest
    Analyze {
        /// Generation target root (holds the manifest)
        #[arg(long, default_value = ".")]
        target: PathBuf,

        /// Microservice the models belong to
        #[arg(long, env = "MIGRATION_GUARD_MICROSERVICE")]
        microservice: String,

        /// Model definitions (JSON or YAML)
        #[arg(long)]
        models: PathBuf,

        /// Print the report as JSON instead of a summary
        #[arg(long)]
        json: bool,

        /// Exit successfully even when dangerous changes are found
        #[arg(long)]
        allow_dangerous: bool,
    },

    /// Record the models as the new baseline for the target
    Update {
        /// Generation target root (holds the manifest)
        #[arg(long, default_value = ".")]
        target: PathBuf,

        /// Microservice the models belong to
        #[arg(long, env = "MIGRATION_GUARD_MICROSERVICE")]
        microservice: String,

        /// Model definitions (JSON or YAML)
        #[arg(long)]
        models: PathBuf,

        /// Applied fixes to append to the manifest history (JSON or YAML)
        #[arg(long)]
        fixes: Option<PathBuf>,

        /// Analyze first and apply the default fixes before recording
        #[arg(long)]
        auto_fix: bool,

        /// Where to write the fixed model definitions (default: rewrite --models)
        #[arg(long, requires = "auto_fix")]
        write_models: Option<PathBuf>,
    },

    /// Show the stored manifest for a target
    Show {
        /// Generation target root (holds the manifest)
        #[arg(long, default_value = ".")]
        target: PathBuf,

        /// Print the raw manifest as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the snapshot checksum of every model in a models file
    Checksum {
        /// Model definitions (JSON or YAML)
        #[arg(long)]
        models: PathBuf,
    },
}

fn parse_timeout(value: &str) -> Result<Duration, String> {
    let duration = humantime::parse_duration(value).map_err(|e| e.to_string())?;
    if duration.is_zero() {
        return Err("timeout must be greater than zero".to_string());
    }
    Ok(duration)
}
