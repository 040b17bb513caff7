//! Result-submission configuration boundary.
//!
//! This module resolves the drop settings a dashboard submission needs from
//! the definition store and hands them to a [`SubmitHandler`]. Transport is
//! the handler's concern; nothing here opens a connection.
//
// Module-level suppression for version-dependent lint false positives from
// miette/thiserror derive macros.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{ProjectConfig, expand_list};

/// Default drop method.
pub const DEFAULT_DROP_METHOD: &str = "http";
/// Default drop site.
pub const DEFAULT_DROP_SITE: &str = "public.kitware.com";
/// Default drop location on the site.
pub const DEFAULT_DROP_LOCATION: &str = "/cgi-bin/HTTPUploadDartFile.cgi";
/// Default trigger URL.
pub const DEFAULT_TRIGGER_SITE: &str =
    "http://public.kitware.com/cgi-bin/Submit-Random-TestingResults.cgi";

const RETURN_VALUE: &str = "RETURN_VALUE";

/// Errors raised by the submission boundary.
#[derive(Debug, Error, Diagnostic, PartialEq, Eq)]
pub enum SubmitError {
    /// `RETURN_VALUE` appeared more than once.
    #[error("submit: RETURN_VALUE specified twice")]
    #[diagnostic(code(kiln::submit::argument))]
    RepeatedReturnValue,

    /// `RETURN_VALUE` was not followed by a variable name.
    #[error("submit: RETURN_VALUE requires a variable name")]
    #[diagnostic(code(kiln::submit::argument))]
    MissingReturnVariable,

    /// An argument other than `RETURN_VALUE <var>` was given.
    #[error("submit: called with incorrect number of arguments; extra argument is `{argument}`")]
    #[diagnostic(code(kiln::submit::argument))]
    UnexpectedArgument {
        /// The first unexpected argument.
        argument: String,
    },

    /// The handler failed before producing a status.
    #[error("submit handler failed: {message}")]
    #[diagnostic(code(kiln::submit::handler))]
    Handler {
        /// Handler-provided description.
        message: String,
    },
}

/// Parsed `submit` arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmitArgs {
    /// Variable receiving the handler status.
    pub return_variable: Option<String>,
}

impl SubmitArgs {
    /// Parse `RETURN_VALUE <var>`; no other arguments are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError`] for a repeated, incomplete or unknown
    /// argument.
    pub fn parse(args: &[String]) -> Result<Self, SubmitError> {
        let mut parsed = Self::default();
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            if arg != RETURN_VALUE {
                return Err(SubmitError::UnexpectedArgument {
                    argument: arg.clone(),
                });
            }
            if parsed.return_variable.is_some() {
                return Err(SubmitError::RepeatedReturnValue);
            }
            let variable = iter.next().ok_or(SubmitError::MissingReturnVariable)?;
            parsed.return_variable = Some(variable.clone());
        }
        Ok(parsed)
    }
}

/// Resolved drop configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmitConfig {
    /// Transport, for example `http` or `scp`.
    pub drop_method: String,
    /// Host receiving results.
    pub drop_site: String,
    /// Path on the host.
    pub drop_location: String,
    /// URL notified after the upload.
    pub trigger_site: String,
    /// Optional user name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drop_site_user: Option<String>,
    /// Optional password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drop_site_password: Option<String>,
    /// Optional `scp` program.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scp_command: Option<String>,
    /// Additional files uploaded with the results.
    pub extra_files: Vec<String>,
    /// Note files attached to the submission.
    pub notes_files: Vec<String>,
}

impl SubmitConfig {
    /// Read drop settings from `config`, falling back to the documented
    /// defaults.
    #[must_use]
    pub fn from_config(config: &ProjectConfig) -> Self {
        let or_default = |key: &str, default: &str| {
            config.get(key).map_or_else(|| default.to_owned(), str::to_owned)
        };
        let trigger_site = config.get("CTEST_TRIGGER_SITE").map_or_else(
            || {
                info!(trigger = DEFAULT_TRIGGER_SITE, "using default trigger site");
                DEFAULT_TRIGGER_SITE.to_owned()
            },
            str::to_owned,
        );
        let list = |key: &str| config.get(key).map(expand_list).unwrap_or_default();
        Self {
            drop_method: or_default("CTEST_DROP_METHOD", DEFAULT_DROP_METHOD),
            drop_site: or_default("CTEST_DROP_SITE", DEFAULT_DROP_SITE),
            drop_location: or_default("CTEST_DROP_LOCATION", DEFAULT_DROP_LOCATION),
            trigger_site,
            drop_site_user: config.get("CTEST_DROP_SITE_USER").map(str::to_owned),
            drop_site_password: config.get("CTEST_DROP_SITE_PASSWORD").map(str::to_owned),
            scp_command: config.get("CTEST_SCP_COMMAND").map(str::to_owned),
            extra_files: list("CTEST_EXTRA_SUBMIT_FILES"),
            notes_files: list("CTEST_NOTES_FILES"),
        }
    }
}

/// Performs the actual submission.
#[cfg_attr(test, mockall::automock)]
pub trait SubmitHandler {
    /// Submit with `config` and return the handler status.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError::Handler`] when no status can be produced.
    fn submit(&self, config: &SubmitConfig) -> Result<i32, SubmitError>;
}

/// Resolve the configuration, run `handler` and store the status in the
/// return variable when one was requested.
///
/// # Errors
///
/// Returns [`SubmitError`] for malformed arguments or a failing handler.
pub fn submit(
    args: &[String],
    config: &mut ProjectConfig,
    handler: &dyn SubmitHandler,
) -> Result<i32, SubmitError> {
    let parsed = SubmitArgs::parse(args)?;
    let resolved = SubmitConfig::from_config(config);
    debug!(site = %resolved.drop_site, method = %resolved.drop_method, "submitting");
    let status = handler.submit(&resolved)?;
    if let Some(variable) = parsed.return_variable {
        config.add(variable, status.to_string());
    }
    Ok(status)
}
