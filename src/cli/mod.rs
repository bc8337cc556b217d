//! CLI module for the kubecompose tool.
//!
//! This module provides the command-line interface for rendering and
//! validating Compose projects.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat};
pub use output::OutputFormatter;
