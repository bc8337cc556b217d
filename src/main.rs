//! Kubecompose CLI entrypoint.
//!
//! This is the main entrypoint for the kubecompose command-line tool.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use kubecompose::cli::{Cli, Commands, OutputFormat, OutputFormatter};
use kubecompose::compose::{ComposeParser, Project, find_compose_file};
use kubecompose::error::{KubeComposeError, Result};
use kubecompose::transform::{TransformOptions, Transformer};

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose, cli.log_json);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
///
/// Logs go to stderr so rendered manifests on stdout stay clean.
fn init_logging(verbose: bool, json: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Dispatches the selected command.
fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Commands::Render {
            format,
            output,
            exclude,
            strict,
        } => cmd_render(&cli, *format, output.as_deref(), exclude, *strict),
        Commands::Validate { warnings } => cmd_validate(&cli, *warnings),
    }
}

/// Render manifests.
fn cmd_render(
    cli: &Cli,
    format: OutputFormat,
    output_path: Option<&Path>,
    exclude: &[String],
    strict: bool,
) -> Result<()> {
    let (project, options) = load_project(cli)?;
    let output = Transformer::new(options).transform(&project, exclude)?;

    let formatter = OutputFormatter::new(format);
    let manifests = formatter.format_manifests(&output.objects)?;

    match output_path {
        Some(path) => {
            std::fs::write(path, &manifests)?;
            info!("Wrote {} objects to {}", output.objects.len(), path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(manifests.as_bytes())?;
            stdout.flush()?;
        }
    }

    eprint!("{}", OutputFormatter::format_diagnostics(&output.diagnostics, true));
    if output_path.is_some() {
        eprint!("{}", OutputFormatter::format_summary(&output));
    }

    if strict && !output.is_success() {
        return Err(KubeComposeError::services_failed(
            output.failures.len(),
            project.services.len(),
        ));
    }
    Ok(())
}

/// Validate per-service configuration.
fn cmd_validate(cli: &Cli, show_warnings: bool) -> Result<()> {
    let (project, options) = load_project(cli)?;
    let transformer = Transformer::new(options);

    let resolutions = transformer.resolve(&project)?;
    eprintln!("\nProject: {}\n", project.name.as_deref().unwrap_or("-"));
    eprint!("{}", OutputFormatter::format_resolutions(&resolutions));

    let output = transformer.transform(&project, &[])?;
    eprint!(
        "\n{}",
        OutputFormatter::format_diagnostics(&output.diagnostics, show_warnings)
    );
    eprint!("{}", OutputFormatter::format_summary(&output));

    if output.is_success() {
        eprintln!("\nConfiguration is valid!");
        Ok(())
    } else {
        Err(KubeComposeError::services_failed(
            output.failures.len(),
            project.services.len(),
        ))
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Resolves the Compose file path.
fn resolve_compose_path(file: Option<&PathBuf>) -> Result<PathBuf> {
    file.map_or_else(|| find_compose_file("."), |path| Ok(path.clone()))
}

/// Loads the project and the conversion options.
fn load_project(cli: &Cli) -> Result<(Project, TransformOptions)> {
    let compose_file = resolve_compose_path(cli.file.as_ref())?;
    debug!("Loading compose file from: {}", compose_file.display());

    let parser = ComposeParser::new().with_base_path(
        compose_file
            .parent()
            .unwrap_or_else(|| Path::new(".")),
    );
    let project = parser.load_file(&compose_file)?;
    let environment = parser.environment_snapshot(cli.env_file.as_deref())?;

    Ok((
        project,
        TransformOptions {
            namespace: cli.namespace.clone(),
            environment,
        },
    ))
}
