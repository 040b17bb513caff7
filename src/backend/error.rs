//! Errors raised while enabling languages or rendering build files.
//
// Scoped suppression for version-dependent lint false positives from
// miette/thiserror derive macros.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use miette::Diagnostic;
use thiserror::Error;

use super::quote::QuoteError;
use crate::config::ConfigError;

/// Failures of [`super::GeneratorBackend`].
#[derive(Debug, Error, Diagnostic)]
pub enum GenerateError {
    /// Rendering was requested before languages were enabled.
    #[error("cannot render build files before languages are enabled")]
    #[diagnostic(
        code(kiln::backend::languages_not_enabled),
        help("list the project languages under `languages` in the Kilnfile")
    )]
    LanguagesNotEnabled,

    /// A command token could not be quoted.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Quote(#[from] QuoteError),

    /// Backend defaults could not be written.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    /// Writing into the output buffer failed.
    #[error("failed to format build file")]
    #[diagnostic(code(kiln::backend::format))]
    Format(#[from] std::fmt::Error),
}
