//! Build file generation for make dialects.
//!
//! A single [`GeneratorBackend`] serves every dialect: the differences live in
//! the [`BackendProfile`] it is constructed with. Rendering is a pure function
//! of the graph, the profile and the configuration, so rendering an unchanged
//! graph twice yields byte-identical files.

mod error;
pub mod local;
pub mod mangle;
pub mod profile;
pub mod quote;

use std::fmt::Write;

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use tracing::{debug, info};

pub use error::GenerateError;
pub use local::LocalContext;
pub use profile::{BackendProfile, ProfileError, ProfileSpec};

use crate::config::{ProjectConfig, SOURCE_DIR};
use crate::graph::{DirectoryScope, RuleGraph, ScopeItem};
use self::quote::{escape_make, include_path};

/// Definition naming the make program used by directory targets.
pub const MAKE_PROGRAM: &str = "KILN_MAKE_PROGRAM";

/// Build files produced by one render, keyed by path relative to the build
/// root, in render order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedFiles {
    files: IndexMap<Utf8PathBuf, String>,
}

impl GeneratedFiles {
    /// Content of the file at `path`.
    #[must_use]
    pub fn get(&self, path: &Utf8Path) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    /// Files in render order.
    pub fn iter(&self) -> impl Iterator<Item = (&Utf8Path, &str)> {
        self.files.iter().map(|(p, c)| (p.as_path(), c.as_str()))
    }

    /// Number of files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether nothing was rendered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn insert(&mut self, path: Utf8PathBuf, content: String) {
        self.files.insert(path, content);
    }
}

/// Renders a [`RuleGraph`] for one make dialect.
#[derive(Debug, Clone)]
pub struct GeneratorBackend {
    profile: BackendProfile,
}

impl GeneratorBackend {
    /// Backend driven by `profile`.
    #[must_use]
    pub const fn new(profile: BackendProfile) -> Self {
        Self { profile }
    }

    /// The profile in effect.
    #[must_use]
    pub const fn profile(&self) -> &BackendProfile {
        &self.profile
    }

    /// Write backend defaults for `languages` into `config`.
    ///
    /// Must run once per pass, before [`GeneratorBackend::render`]. Values
    /// the user already defined are kept.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::Config`] when languages were already enabled
    /// or a default is written twice.
    pub fn enable_language(
        &self,
        languages: &[String],
        config: &mut ProjectConfig,
    ) -> Result<(), GenerateError> {
        config.record_languages(languages)?;
        let profile = &self.profile;
        config.define_default("KILN_GENERATOR", profile.name())?;
        config.define_default(MAKE_PROGRAM, profile.make_program())?;
        config.define_default("KILN_OBJECT_EXTENSION", profile.object_extension())?;
        for language in languages {
            if let Some(compiler) = profile.compiler(language) {
                let key = format!("KILN_{}_COMPILER", language.to_ascii_uppercase());
                config.define_default(key, compiler)?;
            } else {
                debug!(%language, backend = profile.key(), "no default compiler");
            }
        }
        for (key, value) in profile.definitions() {
            config.define_default(key, value)?;
        }
        info!(backend = profile.name(), languages = languages.len(), "enabled languages");
        Ok(())
    }

    /// Rendering context for `directory`.
    #[must_use]
    pub fn create_local_context(&self, directory: impl Into<Utf8PathBuf>) -> LocalContext<'_> {
        LocalContext::new(directory, &self.profile)
    }

    /// Render the top-level build file followed by one fragment per
    /// directory scope.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::LanguagesNotEnabled`] when
    /// [`GeneratorBackend::enable_language`] has not run, and other
    /// [`GenerateError`] variants when a command cannot be rendered.
    pub fn render(
        &self,
        graph: &RuleGraph,
        config: &ProjectConfig,
    ) -> Result<GeneratedFiles, GenerateError> {
        if config.enabled_languages().is_none() {
            return Err(GenerateError::LanguagesNotEnabled);
        }
        let mut files = GeneratedFiles::default();
        let source_root = config.get(SOURCE_DIR).map(Utf8Path::new);
        let contexts: Vec<LocalContext<'_>> = graph
            .scopes()
            .iter()
            .map(|scope| {
                let ctx = self.create_local_context(scope.path());
                match source_root {
                    Some(root) => ctx.with_source_root(root),
                    None => ctx,
                }
            })
            .collect();
        files.insert(
            Utf8PathBuf::from(self.profile.build_file()),
            self.render_top_level(graph, config, &contexts)?,
        );
        for (scope, ctx) in graph.scopes().iter().zip(&contexts) {
            let content = ctx.render_scope(graph, scope)?;
            debug!(path = %ctx.fragment_path(), "rendered fragment");
            files.insert(ctx.fragment_path(), content);
        }
        Ok(files)
    }

    fn render_top_level(
        &self,
        graph: &RuleGraph,
        config: &ProjectConfig,
        contexts: &[LocalContext<'_>],
    ) -> Result<String, GenerateError> {
        let profile = &self.profile;
        let mut out = String::new();
        writeln!(out, "# Generated by kiln for the \"{}\" backend.", profile.name())?;
        writeln!(out, "# Do not edit: changes are lost on the next run.")?;
        writeln!(out)?;
        if profile.define_windows_null() {
            writeln!(out, "NULL =")?;
        }
        writeln!(out, "SILENT_FLAGS = {}", profile.silent_flag())?;
        for key in config.backend_keys() {
            if let Some(value) = config.get(key) {
                writeln!(out, "{key} = {}", escape_make(value))?;
            }
        }
        writeln!(out)?;

        let root = self.create_local_context(".");
        let deps: Vec<String> = graph
            .targets()
            .map(|t| t.name.clone())
            .chain(graph.utilities().map(|u| u.name.clone()))
            .collect();
        root.write_dependencies(&mut out, "all", true, &deps)?;
        writeln!(out)?;

        for ctx in contexts {
            writeln!(
                out,
                "{} {}",
                profile.include_directive(),
                include_path(profile, &ctx.fragment_path())
            )?;
        }

        let program = config
            .get(MAKE_PROGRAM)
            .unwrap_or_else(|| profile.make_program());
        for scope in graph.scopes() {
            if scope.path() == "." {
                continue;
            }
            let names = scope_target_names(graph, scope);
            if names.is_empty() {
                continue;
            }
            let name = format!("{}/all", scope.path());
            writeln!(out)?;
            root.write_dependencies(&mut out, &name, true, &[])?;
            writeln!(
                out,
                "\t{program} $(SILENT_FLAGS) -f {} {}",
                profile.build_file(),
                names.join(" ")
            )?;
        }
        Ok(out)
    }
}

/// Targets and utilities declared in `scope`, in insertion order.
fn scope_target_names<'g>(graph: &'g RuleGraph, scope: &DirectoryScope) -> Vec<&'g str> {
    scope
        .items()
        .iter()
        .filter_map(|item| match *item {
            ScopeItem::Target(id) => graph.target(id).map(|t| t.name.as_str()),
            ScopeItem::Utility(id) => graph.utility(id).map(|u| u.name.as_str()),
            ScopeItem::Rule(_) => None,
        })
        .collect()
}
