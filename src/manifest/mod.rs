//! Project file loading helpers.
//!
//! A `Kilnfile` is plain YAML: there is no templating pass. Values may refer
//! to definitions with `${NAME}`, but those references are resolved later by
//! the coordinator against the configuration of the pass, so the loader only
//! parses and checks the format version.

use anyhow::{Context, Result};
use camino::Utf8Path;
use std::fs;

use crate::ast::KilnManifest;

mod diagnostics;

pub use diagnostics::{ManifestError, map_yaml_error};

/// Major version of the project file format understood by this release.
pub const SUPPORTED_MAJOR: u64 = 1;

fn from_str_named(yaml: &str, name: &str) -> Result<KilnManifest> {
    let manifest: KilnManifest = serde_saphyr::from_str(yaml).map_err(|e| ManifestError::Parse {
        source: map_yaml_error(e, yaml, name),
    })?;
    if manifest.kiln_version.major != SUPPORTED_MAJOR {
        return Err(ManifestError::UnsupportedVersion {
            found: manifest.kiln_version,
            supported: SUPPORTED_MAJOR,
        }
        .into());
    }
    Ok(manifest)
}

/// Parse a project file from a string.
///
/// # Errors
///
/// Returns an error if the YAML does not match the schema or declares an
/// unsupported `kiln_version`.
pub fn from_str(yaml: &str) -> Result<KilnManifest> {
    from_str_named(yaml, "Kilnfile")
}

/// Load a [`KilnManifest`] from the given file path.
///
/// # Errors
///
/// Returns an error if the file cannot be read or fails to parse.
pub fn from_path(path: &Utf8Path) -> Result<KilnManifest> {
    let data = fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;
    from_str_named(&data, path.as_str())
}
