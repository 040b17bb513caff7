//! Definition store for a single configuration pass.
//!
//! [`ProjectConfig`] is the explicit key/value context handed to every stage
//! of a pass. User definitions from the `Kilnfile` and `-D` overrides are
//! written with [`ProjectConfig::add`]; backend defaults go through
//! [`ProjectConfig::define_default`], which enforces a write-once discipline
//! so a pass stays reproducible regardless of the order in which defaults are
//! applied.
//!
//! Lists are stored as `;`-separated strings, matching the way declarative
//! commands read and extend named source lists.
//!
//! ```
//! use kiln::config::ProjectConfig;
//!
//! let mut config = ProjectConfig::new();
//! config.add("SRCS", "a.cxx;b.cxx");
//! config.append_list("SRCS", &["c.cxx".to_owned()]);
//! assert_eq!(config.get("SRCS"), Some("a.cxx;b.cxx;c.cxx"));
//! ```
//
// Module-level suppression for version-dependent lint false positives from
// miette/thiserror derive macros.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use indexmap::{IndexMap, IndexSet};
use miette::Diagnostic;
use thiserror::Error;

/// Absolute source root of the pass, seeded before any directory runs.
pub const SOURCE_DIR: &str = "KILN_SOURCE_DIR";

/// Build root of the pass.
pub const BINARY_DIR: &str = "KILN_BINARY_DIR";

/// Errors raised while reading or writing project definitions.
#[derive(Debug, Error, Diagnostic, PartialEq, Eq)]
pub enum ConfigError {
    /// A definition the pass cannot continue without is absent.
    #[error("required definition `{key}` is not set")]
    #[diagnostic(
        code(kiln::config::missing_required_definition),
        help("define it under `definitions` in the Kilnfile or pass -D KEY=VALUE")
    )]
    MissingRequiredDefinition {
        /// Name of the missing definition.
        key: String,
    },

    /// A `${NAME}` list reference names an undefined list.
    #[error("list `{name}` cannot be expanded: it is not defined")]
    #[diagnostic(code(kiln::config::unresolved_list))]
    UnresolvedList {
        /// Name of the unresolved list.
        name: String,
    },

    /// A backend default was written twice in the same pass.
    #[error("definition `{key}` was already written by a backend during this pass")]
    #[diagnostic(code(kiln::config::already_defined))]
    AlreadyDefined {
        /// Key written twice.
        key: String,
    },

    /// Languages were enabled more than once in the same pass.
    #[error("languages are already enabled for this pass ({enabled})")]
    #[diagnostic(code(kiln::config::language_already_enabled))]
    LanguageAlreadyEnabled {
        /// Languages recorded by the first call, comma separated.
        enabled: String,
    },
}

/// Returns `true` when `value` spells an enabled flag.
///
/// Accepted spellings are `1`, `ON`, `YES`, `TRUE` and `Y`, compared
/// case-insensitively. Everything else, including the empty string, is off.
#[must_use]
pub fn is_on(value: &str) -> bool {
    ["1", "ON", "YES", "TRUE", "Y"]
        .iter()
        .any(|truthy| value.trim().eq_ignore_ascii_case(truthy))
}

/// Split a `;`-separated list, dropping empty elements.
#[must_use]
pub fn expand_list(value: &str) -> Vec<String> {
    value
        .split(';')
        .filter(|item| !item.is_empty())
        .map(str::to_owned)
        .collect()
}

/// If `arg` is exactly one `${NAME}` reference, return `NAME`.
fn whole_reference(arg: &str) -> Option<&str> {
    arg.strip_prefix("${")
        .and_then(|rest| rest.strip_suffix('}'))
        .filter(|name| !name.is_empty() && !name.contains(['$', '{', '}']))
}

/// Key/value definitions for one configuration pass.
#[derive(Debug, Clone, Default)]
pub struct ProjectConfig {
    definitions: IndexMap<String, String>,
    backend_keys: IndexSet<String>,
    languages: Option<Vec<String>>,
}

impl ProjectConfig {
    /// Create an empty definition store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from user definitions, preserving their order.
    pub fn from_definitions<I, K, V>(definitions: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut config = Self::new();
        for (key, value) in definitions {
            config.add(key, value);
        }
        config
    }

    /// Look up a definition.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.definitions.get(key).map(String::as_str)
    }

    /// Look up a definition that must be present.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingRequiredDefinition`] when `key` is unset.
    /// An empty placeholder is never returned in its place.
    pub fn get_required(&self, key: &str) -> Result<&str, ConfigError> {
        self.get(key)
            .ok_or_else(|| ConfigError::MissingRequiredDefinition {
                key: key.to_owned(),
            })
    }

    /// Set a user definition, replacing any previous value.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.definitions.insert(key.into(), value.into());
    }

    /// Write a backend default.
    ///
    /// A value already supplied by the user is kept and `Ok(false)` is
    /// returned. Otherwise the default is stored and `Ok(true)` returned.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::AlreadyDefined`] when a backend has already
    /// written `key` during this pass.
    pub fn define_default(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<bool, ConfigError> {
        let key = key.into();
        if self.backend_keys.contains(&key) {
            return Err(ConfigError::AlreadyDefined { key });
        }
        self.backend_keys.insert(key.clone());
        if self.definitions.contains_key(&key) {
            tracing::debug!(%key, "keeping user definition over backend default");
            return Ok(false);
        }
        self.definitions.insert(key, value.into());
        Ok(true)
    }

    /// Keys written by a backend during this pass, in write order.
    pub fn backend_keys(&self) -> impl Iterator<Item = &str> {
        self.backend_keys.iter().map(String::as_str)
    }

    /// Whether `key` is defined to an enabled value (see [`is_on`]).
    #[must_use]
    pub fn is_on(&self, key: &str) -> bool {
        self.get(key).is_some_and(is_on)
    }

    /// Append `items` to the list stored under `key`.
    ///
    /// The current value is read, extended and stored back; existing entries
    /// are never removed.
    pub fn append_list(&mut self, key: &str, items: &[String]) {
        if items.is_empty() {
            return;
        }
        let mut value = self.get(key).unwrap_or_default().to_owned();
        for item in items {
            if !value.is_empty() {
                value.push(';');
            }
            value.push_str(item);
        }
        self.add(key, value);
    }

    /// Replace every `${NAME}` reference inside `text`.
    ///
    /// An unterminated `${` is kept literally.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingRequiredDefinition`] for a reference to
    /// an undefined name.
    pub fn expand_references(&self, text: &str) -> Result<String, ConfigError> {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some((before, after)) = rest.split_once("${") {
            out.push_str(before);
            if let Some((name, remainder)) = after.split_once('}') {
                out.push_str(self.get_required(name)?);
                rest = remainder;
            } else {
                out.push_str("${");
                out.push_str(after);
                rest = "";
            }
        }
        out.push_str(rest);
        Ok(out)
    }

    /// Expand declarative command arguments into a flat list.
    ///
    /// An argument that is exactly `${NAME}` is replaced by the elements of
    /// that list. Any other argument has its references substituted and is
    /// then split on `;`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnresolvedList`] when a list reference names an
    /// undefined list, or [`ConfigError::MissingRequiredDefinition`] for an
    /// undefined reference embedded in a longer argument.
    pub fn expand_arguments(&self, args: &[String]) -> Result<Vec<String>, ConfigError> {
        let mut expanded = Vec::with_capacity(args.len());
        for arg in args {
            if let Some(name) = whole_reference(arg) {
                let value = self.get(name).ok_or_else(|| ConfigError::UnresolvedList {
                    name: name.to_owned(),
                })?;
                expanded.extend(expand_list(value));
            } else {
                expanded.extend(expand_list(&self.expand_references(arg)?));
            }
        }
        Ok(expanded)
    }

    /// Record the languages enabled for this pass.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::LanguageAlreadyEnabled`] on a second call.
    pub fn record_languages(&mut self, languages: &[String]) -> Result<(), ConfigError> {
        if let Some(enabled) = &self.languages {
            return Err(ConfigError::LanguageAlreadyEnabled {
                enabled: enabled.join(", "),
            });
        }
        self.languages = Some(languages.to_vec());
        Ok(())
    }

    /// Languages enabled for this pass, or `None` before enablement.
    #[must_use]
    pub fn enabled_languages(&self) -> Option<&[String]> {
        self.languages.as_deref()
    }

    /// Iterate over all definitions in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.definitions
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}
