//! CLI execution and command dispatch logic.
//!
//! This module keeps `main` minimal by providing a single entry point that
//! handles command execution: loading the project file, running one
//! configuration pass and writing the generated build files.

mod error;
mod path_helpers;

pub use error::RunnerError;

use std::fs;
use std::io::{self, Write};

use anyhow::{Context, Result};
use camino::Utf8Path;
use tracing::{debug, info};

use crate::backend::profile::{BackendProfile, builtin};
use crate::backend::GeneratorBackend;
use crate::cli::{Cli, Commands};
use crate::config::ProjectConfig;
use crate::coordinator::{GeneratorCoordinator, WriteSummary, documentation_summary};
use crate::manifest;
use crate::submit::{self, SubmitConfig, SubmitError, SubmitHandler};

use path_helpers::{ensure_manifest_exists, resolve_layout, resolve_manifest_path};

/// Execute the parsed [`Cli`] commands.
///
/// # Errors
///
/// Returns an error if the project cannot be loaded, configured or written.
pub fn run(cli: &Cli) -> Result<()> {
    match cli.command.clone().unwrap_or(Commands::Generate) {
        Commands::Generate => {
            let summary = handle_generate(cli)?;
            let mut stdout = io::stdout().lock();
            writeln!(
                stdout,
                "{} file(s) written, {} unchanged",
                summary.written, summary.unchanged
            )
            .context("writing summary")?;
            Ok(())
        }
        Commands::Backends => handle_backends(&mut io::stdout().lock()),
        Commands::Submit { args } => handle_submit(cli, &args),
    }
}

/// Load the backend profile selected on the command line.
fn load_profile(cli: &Cli) -> Result<BackendProfile> {
    if let Some(path) = &cli.profile {
        let yaml = fs::read_to_string(path).with_context(|| format!("reading profile {path}"))?;
        return BackendProfile::from_yaml(&yaml).with_context(|| format!("loading profile {path}"));
    }
    Ok(builtin(&cli.backend)?)
}

/// Configure the project and write its build files.
///
/// # Errors
///
/// Returns an error if any stage of the pass fails; nothing is written
/// unless configuration and rendering both succeed.
fn handle_generate(cli: &Cli) -> Result<WriteSummary> {
    let manifest_path = resolve_manifest_path(cli)?;
    ensure_manifest_exists(&manifest_path)?;
    let manifest = manifest::from_path(&manifest_path)
        .with_context(|| format!("loading project file {manifest_path}"))?;
    if tracing::enabled!(tracing::Level::DEBUG) {
        let ast_json = serde_json::to_string_pretty(&manifest).context("serialising manifest")?;
        debug!("AST:\n{ast_json}");
    }

    let profile = load_profile(cli)?;
    let layout = resolve_layout(cli, &manifest_path)?;
    info!(backend = profile.name(), source = %layout.source_root, build = %layout.binary_root, "generating");
    let coordinator = GeneratorCoordinator::new(GeneratorBackend::new(profile), layout);
    let project = coordinator
        .configure(&manifest, &cli.define)
        .context("configuring project")?;
    let files = coordinator.generate(&project).context("rendering build files")?;
    let summary = coordinator
        .write_outputs(&files, &project.manifests)
        .context("writing build files")?;
    Ok(summary)
}

/// Print the built-in backend catalogue.
fn handle_backends(out: &mut impl Write) -> Result<()> {
    for entry in documentation_summary() {
        writeln!(out, "{:<8} {:<18} {}", entry.key, entry.name, entry.brief)
            .context("writing backend list")?;
    }
    Ok(())
}

/// Handler that reports the resolved configuration instead of uploading.
struct JsonReport<'a> {
    path: &'a Utf8Path,
}

impl SubmitHandler for JsonReport<'_> {
    fn submit(&self, config: &SubmitConfig) -> Result<i32, SubmitError> {
        let json = serde_json::to_string_pretty(config).map_err(|e| SubmitError::Handler {
            message: e.to_string(),
        })?;
        writeln!(io::stdout().lock(), "{json}").map_err(|e| SubmitError::Handler {
            message: e.to_string(),
        })?;
        debug!(project = %self.path, "reported submission configuration");
        Ok(0)
    }
}

/// Resolve the submission configuration from the project's definitions.
fn handle_submit(cli: &Cli, args: &[String]) -> Result<()> {
    let manifest_path = resolve_manifest_path(cli)?;
    ensure_manifest_exists(&manifest_path)?;
    let manifest = manifest::from_path(&manifest_path)
        .with_context(|| format!("loading project file {manifest_path}"))?;
    let mut config = ProjectConfig::from_definitions(manifest.definitions);
    for (key, value) in &cli.define {
        config.add(key.as_str(), value.as_str());
    }
    let handler = JsonReport {
        path: &manifest_path,
    };
    let status = submit::submit(args, &mut config, &handler).context("resolving submission")?;
    debug!(status, "submission finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn backend_list_has_one_line_per_builtin() {
        let mut out = Vec::new();
        handle_backends(&mut out).expect("list");
        let text = String::from_utf8(out).expect("utf8");
        assert_eq!(text.lines().count(), 4);
        assert!(text.starts_with("unix"));
        assert!(text.contains("Watcom WMake"));
    }
}
