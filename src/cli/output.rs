//! Output formatting for CLI commands.
//!
//! This module renders manifests and the human-readable reports of the
//! `render` and `validate` commands.

use colored::Colorize;
use std::collections::BTreeMap;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::diagnostics::{Diagnostics, Severity};
use crate::error::{KubeComposeError, Result};
use crate::k8s::KubernetesObject;
use crate::transform::{ServiceResolution, TransformOutput};

use super::commands::OutputFormat;

/// YAML document separator.
const DOCUMENT_SEPARATOR: &str = "---\n";

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Manifest format.
    format: OutputFormat,
}

/// Resolved service row for table display.
#[derive(Tabled)]
struct ServiceRow {
    #[tabled(rename = "Service")]
    name: String,
    #[tabled(rename = "Workload")]
    workload: String,
    #[tabled(rename = "Replicas")]
    replicas: String,
    #[tabled(rename = "Service type")]
    service_type: String,
    #[tabled(rename = "Status")]
    status: String,
}

/// Object count row for table display.
#[derive(Tabled)]
struct KindRow {
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Count")]
    count: usize,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Serializes objects as multi-document YAML or a JSON array.
    ///
    /// # Errors
    ///
    /// Returns an error if an object cannot be serialized.
    pub fn format_manifests(&self, objects: &[KubernetesObject]) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(objects)
                .map(|mut json| {
                    json.push('\n');
                    json
                })
                .map_err(|e| KubeComposeError::serialization(e.to_string())),
            OutputFormat::Yaml => {
                let mut output = String::new();
                for object in objects {
                    let document = serde_yaml::to_string(object)
                        .map_err(|e| KubeComposeError::serialization(e.to_string()))?;
                    output.push_str(DOCUMENT_SEPARATOR);
                    output.push_str(&document);
                }
                Ok(output)
            }
        }
    }

    /// Formats the per-service resolution table.
    #[must_use]
    pub fn format_resolutions(resolutions: &[ServiceResolution]) -> String {
        let rows: Vec<ServiceRow> = resolutions
            .iter()
            .map(|r| match &r.config {
                Ok(config) if config.disabled => ServiceRow {
                    name: r.name.clone(),
                    workload: String::from("-"),
                    replicas: String::from("-"),
                    service_type: String::from("-"),
                    status: "disabled".dimmed().to_string(),
                },
                Ok(config) => ServiceRow {
                    name: r.name.clone(),
                    workload: config.workload.kind.to_string(),
                    replicas: config.workload.replicas.to_string(),
                    service_type: config.service.kind.to_string(),
                    status: "ok".green().to_string(),
                },
                Err(e) => ServiceRow {
                    name: r.name.clone(),
                    workload: String::from("-"),
                    replicas: String::from("-"),
                    service_type: String::from("-"),
                    status: Self::truncate(&e.to_string(), 60).red().to_string(),
                },
            })
            .collect();

        let mut output = Table::new(rows).to_string();
        output.push('\n');
        output
    }

    /// Formats a summary of a conversion run.
    #[must_use]
    pub fn format_summary(output: &TransformOutput) -> String {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for object in &output.objects {
            *counts.entry(object.kind()).or_default() += 1;
        }
        let rows: Vec<KindRow> = counts
            .into_iter()
            .map(|(kind, count)| KindRow {
                kind: kind.to_string(),
                count,
            })
            .collect();

        let mut summary = String::new();
        if !rows.is_empty() {
            summary.push_str(&Table::new(rows).to_string());
            summary.push('\n');
        }

        let status = if output.is_success() {
            format!("{} {} objects rendered", "✓".green(), output.objects.len())
        } else {
            format!(
                "{} {} objects rendered, {} failures",
                "✗".red(),
                output.objects.len(),
                output.failures.len()
            )
        };
        let _ = writeln!(summary, "{status}");
        for failure in &output.failures {
            let _ = writeln!(summary, "   - {failure}");
        }
        summary
    }

    /// Formats diagnostics, one per line; warnings only when requested.
    #[must_use]
    pub fn format_diagnostics(diagnostics: &Diagnostics, show_warnings: bool) -> String {
        let mut output = String::new();
        for entry in diagnostics.entries() {
            let marker = match entry.severity {
                Severity::Warning if !show_warnings => continue,
                Severity::Warning => "⚠".yellow(),
                Severity::Error => "✗".red(),
            };
            let _ = writeln!(output, "{marker} {entry}");
        }
        output
    }

    /// Truncates a string to a maximum length.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
            format!("{head}...")
        }
    }
}
