//! Error types for the rule graph.
//
// Scoped suppression for version-dependent lint false positives from
// miette/thiserror derive macros.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use camino::Utf8PathBuf;
use itertools::Itertools;
use miette::Diagnostic;
use thiserror::Error;

use super::RuleId;

/// Integrity violations detected while populating a [`super::RuleGraph`].
#[derive(Debug, Error, Diagnostic, PartialEq, Eq)]
pub enum GraphError {
    /// Another rule already produces this output.
    #[error("output `{output}` is already produced by {existing}")]
    #[diagnostic(
        code(kiln::graph::duplicate_output),
        help("every output path must be produced by exactly one rule")
    )]
    DuplicateOutput {
        /// The contested output path.
        output: Utf8PathBuf,
        /// Rule that registered the output first.
        existing: RuleId,
    },

    /// A rule lists the same output more than once.
    #[error("rule lists output `{output}` more than once")]
    #[diagnostic(code(kiln::graph::repeated_output))]
    RepeatedOutput {
        /// The repeated output path.
        output: Utf8PathBuf,
    },

    /// A utility or target name is already taken.
    #[error("target name `{name}` is already in use")]
    #[diagnostic(code(kiln::graph::duplicate_name))]
    DuplicateName {
        /// The colliding name.
        name: String,
    },

    /// A rule has no command to run.
    #[error("rule for `{output}` has no command invocation")]
    #[diagnostic(code(kiln::graph::empty_command))]
    EmptyCommand {
        /// First output of the offending rule.
        output: Utf8PathBuf,
    },

    /// A rule declares no outputs.
    #[error("rule declares no outputs")]
    #[diagnostic(code(kiln::graph::empty_outputs))]
    EmptyOutputs,

    /// Rules depend on each other in a loop.
    #[error("circular dependency: {}", format_cycle(.cycle))]
    #[diagnostic(code(kiln::graph::circular_dependency))]
    CircularDependency {
        /// Outputs along the cycle; the first entry is repeated at the end.
        cycle: Vec<Utf8PathBuf>,
    },
}

fn format_cycle(cycle: &[Utf8PathBuf]) -> String {
    cycle.iter().join(" -> ")
}
