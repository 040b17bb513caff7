//! Error types for the runner module.

// Module-level suppression for version-dependent lint false positives from
// miette/thiserror derive macros.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

/// Errors raised during command execution.
#[derive(Debug, Error, Diagnostic)]
pub enum RunnerError {
    /// The project file does not exist at the expected path.
    #[error("project file `{path}` not found")]
    #[diagnostic(
        code(kiln::runner::manifest_not_found),
        help("create a Kilnfile or point at one with `-f` / `-C`")
    )]
    ManifestNotFound {
        /// The path that was attempted.
        path: Utf8PathBuf,
    },

    /// The project file path has no file name component.
    #[error("project file path `{path}` has no file name")]
    #[diagnostic(code(kiln::runner::manifest_path))]
    ManifestPathMissingName {
        /// The offending path.
        path: Utf8PathBuf,
    },
}
