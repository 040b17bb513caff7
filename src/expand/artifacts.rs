//! Artifact manifests consumed by out-of-process packaging steps.
//!
//! A manifest is regenerated in full on every pass. Entries keep the order of
//! the source list that produced them.

use camino::{Utf8Path, Utf8PathBuf};

/// Name of the manifest written by `wrap_java`.
pub const JAVA_DEPENDENCIES_FILE: &str = "JavaDependencies.list";

/// A list of externally produced artifact paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactManifest {
    path: Utf8PathBuf,
    generator: String,
    variable: String,
    artifacts: Vec<Utf8PathBuf>,
}

impl ArtifactManifest {
    /// Empty manifest stored at `path`, produced by `generator` and
    /// extending the list variable `variable`.
    pub fn new(
        path: impl Into<Utf8PathBuf>,
        generator: impl Into<String>,
        variable: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            generator: generator.into(),
            variable: variable.into(),
            artifacts: Vec::new(),
        }
    }

    /// Append an artifact.
    pub fn push(&mut self, artifact: impl Into<Utf8PathBuf>) {
        self.artifacts.push(artifact.into());
    }

    /// Where the manifest is written.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Listed artifacts.
    #[must_use]
    pub fn artifacts(&self) -> &[Utf8PathBuf] {
        &self.artifacts
    }

    /// Manifest text.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = format!(
            "# This file is automatically generated by kiln {}\n\nset({var} ${{{var}}}\n",
            self.generator,
            var = self.variable
        );
        for artifact in &self.artifacts {
            out.push_str("  ");
            out.push_str(artifact.as_str());
            out.push('\n');
        }
        out.push_str(")\n");
        out
    }
}
