//! Declarative commands that expand into rules.
//!
//! An expander runs in two explicit steps. [`Command::expand`] inspects the
//! arguments and the source registry and returns an [`Expansion`] without
//! touching the graph. The caller merges the returned [`SourceListUpdate`]
//! into the configuration, then [`Command::finalize`] resolves the shared
//! tool paths once and registers the rules for every entry.
//
// Module-level suppression for version-dependent lint false positives from
// miette/thiserror derive macros.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

pub mod artifacts;
pub mod wrap_java;

use camino::Utf8Path;
use miette::Diagnostic;
use thiserror::Error;

pub use artifacts::ArtifactManifest;
pub use wrap_java::{WrapEntry, WrapJava};

use crate::config::{ConfigError, ProjectConfig};
use crate::graph::{GraphError, RuleGraph};
use crate::sources::SourceRegistry;

/// Errors raised by declarative commands.
#[derive(Debug, Error, Diagnostic, PartialEq, Eq)]
pub enum ExpandError {
    /// The command was invoked with malformed arguments.
    #[error("{command}: {message}")]
    #[diagnostic(code(kiln::expand::argument))]
    Argument {
        /// Command name.
        command: String,
        /// What is wrong with the arguments.
        message: String,
    },

    /// The command name is not known.
    #[error("unknown command `{name}`")]
    #[diagnostic(
        code(kiln::expand::unknown_command),
        help("the only declarative command is `wrap_java`")
    )]
    UnknownCommand {
        /// The unknown name.
        name: String,
    },

    /// A definition the command needs is missing or malformed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    /// Registering the generated rules failed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),
}

/// Where a command runs and what it can read.
#[derive(Debug, Clone, Copy)]
pub struct ExpandContext<'a> {
    /// Source directory the command was declared in.
    pub source_dir: &'a Utf8Path,
    /// Output directory for files generated on behalf of that directory.
    pub output_dir: &'a Utf8Path,
    /// Definitions for the pass.
    pub config: &'a ProjectConfig,
}

/// Items to append to a named source list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceListUpdate {
    /// Name of the list definition.
    pub list: String,
    /// New entries in source order.
    pub items: Vec<String>,
}

impl SourceListUpdate {
    /// Append the items to the list stored in `config`.
    pub fn merge_into(&self, config: &mut ProjectConfig) {
        config.append_list(&self.list, &self.items);
    }
}

/// Result of the expansion step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    /// One entry per wrapped source.
    pub entries: Vec<WrapEntry>,
    /// Additions to the named source list.
    pub source_list: SourceListUpdate,
    /// Side-channel listing of externally produced artifacts.
    pub manifest: ArtifactManifest,
}

/// What finalization registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finalized {
    /// Number of rules added.
    pub rules: usize,
    /// Name of the aggregating utility target.
    pub utility: String,
}

/// A parsed declarative command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `wrap_java: [library, LIST, sources...]`.
    WrapJava(WrapJava),
}

impl Command {
    /// Parse the command `name` with raw `args`.
    ///
    /// # Errors
    ///
    /// Returns [`ExpandError::UnknownCommand`] for an unknown name and the
    /// command's own argument errors otherwise.
    pub fn parse(
        name: &str,
        args: &[String],
        config: &ProjectConfig,
    ) -> Result<Self, ExpandError> {
        match name {
            WrapJava::NAME => Ok(Self::WrapJava(WrapJava::parse(args, config)?)),
            other => Err(ExpandError::UnknownCommand {
                name: other.to_owned(),
            }),
        }
    }

    /// Command name as written in the project file.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::WrapJava(_) => WrapJava::NAME,
        }
    }

    /// Run the expansion step; `None` when the command is switched off.
    ///
    /// # Errors
    ///
    /// Returns [`ExpandError`] when required definitions are missing.
    pub fn expand(
        &self,
        ctx: &ExpandContext<'_>,
        sources: &SourceRegistry,
    ) -> Result<Option<Expansion>, ExpandError> {
        match self {
            Self::WrapJava(cmd) => cmd.expand(ctx, sources),
        }
    }

    /// Register rules for an expansion.
    ///
    /// # Errors
    ///
    /// Returns [`ExpandError`] when tool definitions are missing or the
    /// graph rejects a rule.
    pub fn finalize(
        &self,
        expansion: &Expansion,
        ctx: &ExpandContext<'_>,
        graph: &mut RuleGraph,
        sources: &mut SourceRegistry,
    ) -> Result<Finalized, ExpandError> {
        match self {
            Self::WrapJava(cmd) => cmd.finalize(&expansion.entries, ctx, graph, sources),
        }
    }
}
