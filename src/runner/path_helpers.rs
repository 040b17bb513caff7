//! Path resolution helpers for the runner module.
//!
//! Centralises project file and build directory logic so the main runner
//! module stays focused on command dispatch.

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};

use super::RunnerError;
use crate::cli::Cli;
use crate::coordinator::BuildLayout;

/// Resolve `path` against the CLI's `-C` directory when it is relative.
fn under_directory(cli: &Cli, path: &Utf8Path) -> Utf8PathBuf {
    match &cli.directory {
        Some(dir) if path.is_relative() => dir.join(path),
        _ => path.to_path_buf(),
    }
}

/// Determine the project file path respecting the CLI's directory option.
///
/// # Errors
///
/// Returns [`RunnerError::ManifestPathMissingName`] when the path has no
/// file name.
pub(super) fn resolve_manifest_path(cli: &Cli) -> Result<Utf8PathBuf> {
    let resolved = under_directory(cli, &cli.file);
    if resolved.file_name().is_none() {
        return Err(RunnerError::ManifestPathMissingName { path: resolved }.into());
    }
    Ok(resolved)
}

/// Return an error when the project file does not exist.
pub(super) fn ensure_manifest_exists(path: &Utf8Path) -> Result<()> {
    if path.as_std_path().exists() {
        Ok(())
    } else {
        Err(RunnerError::ManifestNotFound {
            path: path.to_path_buf(),
        }
        .into())
    }
}

/// Source root is the project file's directory; the build root honours `-C`.
///
/// The source root is made absolute because build files are read from the
/// build root, not from the directory kiln was started in.
///
/// # Errors
///
/// Returns an error when the working directory cannot be read or the
/// absolute source root is not valid UTF-8.
pub(super) fn resolve_layout(cli: &Cli, manifest_path: &Utf8Path) -> Result<BuildLayout> {
    let parent = manifest_path
        .parent()
        .filter(|p| !p.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let absolute = std::path::absolute(parent)
        .with_context(|| format!("resolving source directory {parent}"))?;
    let source_root = Utf8PathBuf::try_from(absolute).context("source directory is not UTF-8")?;
    Ok(BuildLayout {
        source_root,
        binary_root: under_directory(cli, &cli.build_dir),
    })
}
