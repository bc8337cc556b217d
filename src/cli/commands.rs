//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Kubecompose - Compose to Kubernetes manifest translator.
#[derive(Parser, Debug)]
#[command(name = "kubecompose")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the Compose file (discovered from the current directory if unset).
    #[arg(short, long, global = true, env = "KUBECOMPOSE_FILE")]
    pub file: Option<PathBuf>,

    /// Namespace set on every emitted object.
    #[arg(short, long, global = true, env = "KUBECOMPOSE_NAMESPACE")]
    pub namespace: Option<String>,

    /// Environment file used for variables declared without a value.
    #[arg(long, global = true)]
    pub env_file: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render the Kubernetes manifests of the project.
    Render {
        /// Manifest format.
        #[arg(long, default_value = "yaml")]
        format: OutputFormat,

        /// Write manifests to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Services to leave out (repeatable).
        #[arg(short = 'x', long = "exclude")]
        exclude: Vec<String>,

        /// Fail if any service could not be converted.
        #[arg(long)]
        strict: bool,
    },

    /// Validate per-service configuration and report diagnostics.
    Validate {
        /// Show all warnings, not just errors.
        #[arg(short, long)]
        warnings: bool,
    },
}

/// Manifest format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Multi-document YAML.
    #[default]
    Yaml,
    /// JSON array.
    Json,
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
