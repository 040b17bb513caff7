//! Command line interface definition using clap.
//!
//! This module defines the [`Cli`] structure and its subcommands.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

mod parsing;

use parsing::{parse_backend, parse_definition};

/// Generate make-style build files for several dialects from one project
/// description.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the project file to use.
    #[arg(short, long, value_name = "FILE", default_value = "Kilnfile")]
    pub file: Utf8PathBuf,

    /// Run as if started in this directory.
    ///
    /// This affects project file lookup and the build directory.
    #[arg(short = 'C', long, value_name = "DIR")]
    pub directory: Option<Utf8PathBuf>,

    /// Directory receiving the generated build files.
    #[arg(short = 'B', long = "build-dir", value_name = "DIR", default_value = "build")]
    pub build_dir: Utf8PathBuf,

    /// Built-in backend to generate for.
    #[arg(
        short = 'G',
        long,
        value_name = "BACKEND",
        default_value = "unix",
        value_parser = parse_backend
    )]
    pub backend: String,

    /// Load a custom backend profile from a YAML file instead.
    #[arg(long, value_name = "FILE", conflicts_with = "backend")]
    pub profile: Option<Utf8PathBuf>,

    /// Define or override a variable (`KEY=VALUE`); may be repeated.
    #[arg(short = 'D', value_name = "KEY=VALUE", value_parser = parse_definition)]
    pub define: Vec<(String, String)>,

    /// Enable verbose diagnostic logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Optional subcommand to execute; defaults to `generate` when omitted.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Parse command-line arguments, providing `generate` as the default
    /// command.
    #[must_use]
    pub fn parse_with_default() -> Self {
        Self::parse().with_default_command()
    }

    /// Apply the default command if none was specified.
    #[must_use]
    pub fn with_default_command(mut self) -> Self {
        if self.command.is_none() {
            self.command = Some(Commands::Generate);
        }
        self
    }
}

/// Available top-level commands for kiln.
#[derive(Debug, Subcommand, PartialEq, Eq, Clone)]
pub enum Commands {
    /// Configure the project and write build files (default).
    Generate,

    /// List the built-in backends.
    Backends,

    /// Print the resolved result-submission configuration as JSON.
    Submit {
        /// Submission arguments, for example `RETURN_VALUE status`.
        #[arg(value_name = "ARG", trailing_var_arg = true)]
        args: Vec<String>,
    },
}
