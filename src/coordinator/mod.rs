//! Project-level generation driver.
//!
//! [`GeneratorCoordinator`] owns the global/local split of a configuration
//! pass. It walks the directories of a [`KilnManifest`] in dependency order,
//! registers each directory's sources, declarative commands, rules, targets
//! and utilities into one [`RuleGraph`], and finally hands the graph to the
//! [`GeneratorBackend`] and writes the results under the build root.
//
// Module-level suppression for version-dependent lint false positives from
// miette/thiserror derive macros.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

mod order;
mod write;

use camino::{Utf8Path, Utf8PathBuf};
use itertools::Itertools;
use miette::Diagnostic;
use thiserror::Error;
use tracing::{debug, info};

pub use write::{WriteOutcome, write_if_changed};

use crate::ast::{CommandSpec, Directory, KilnManifest, RuleDecl};
use crate::backend::profile::builtin_specs;
use crate::backend::{GenerateError, GeneratedFiles, GeneratorBackend};
use crate::config::{BINARY_DIR, ConfigError, ProjectConfig, SOURCE_DIR};
use crate::expand::{ArtifactManifest, Command, ExpandContext, ExpandError};
use crate::graph::{GraphError, GraphReport, Rule, RuleGraph};
use crate::sources::{SourceFile, SourceRegistry};

/// Name of the root utility aggregating every wrapped library.
pub const JAVA_CLASSES_TARGET: &str = "java_classes";

/// Errors raised while configuring or generating a project.
#[derive(Debug, Error, Diagnostic)]
pub enum CoordinatorError {
    /// Two directories share a path.
    #[error("directory `{path}` is declared more than once")]
    #[diagnostic(code(kiln::coordinator::duplicate_directory))]
    DuplicateDirectory {
        /// Repeated path.
        path: Utf8PathBuf,
    },

    /// A directory depends on one that is not declared.
    #[error("directory `{directory}` depends on undeclared directory `{dependency}`")]
    #[diagnostic(code(kiln::coordinator::unknown_directory))]
    UnknownDirectory {
        /// Directory holding the reference.
        directory: Utf8PathBuf,
        /// The undeclared dependency.
        dependency: Utf8PathBuf,
    },

    /// `depends_on` forms a cycle.
    #[error("directory dependency cycle among: {}", directories.iter().join(", "))]
    #[diagnostic(
        code(kiln::coordinator::directory_cycle),
        help("remove one of the `depends_on` entries between these directories")
    )]
    DirectoryCycle {
        /// Directories that could not be ordered.
        directories: Vec<Utf8PathBuf>,
    },

    /// A declarative command failed.
    #[error("command `{command}` in directory `{directory}` failed")]
    #[diagnostic(code(kiln::coordinator::command))]
    Command {
        /// Command name.
        command: String,
        /// Directory the command was declared in.
        directory: Utf8PathBuf,
        /// Underlying failure.
        #[source]
        #[diagnostic_source]
        source: ExpandError,
    },

    /// A rule command line could not be split into tokens.
    #[error("cannot split command line `{line}` in directory `{directory}`")]
    #[diagnostic(
        code(kiln::coordinator::command_line),
        help("check for an unterminated quote or use a token list")
    )]
    InvalidCommandLine {
        /// Directory the rule was declared in.
        directory: Utf8PathBuf,
        /// The offending line.
        line: String,
    },

    /// The graph rejected a rule, target or utility.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),

    /// A definition was missing or malformed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    /// Rendering failed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Generate(#[from] GenerateError),

    /// An output file could not be written.
    #[error("failed to write `{path}`")]
    #[diagnostic(code(kiln::coordinator::io))]
    Io {
        /// File being written.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Source and build roots of a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildLayout {
    /// Directory holding the project file.
    pub source_root: Utf8PathBuf,
    /// Directory receiving generated files.
    pub binary_root: Utf8PathBuf,
}

/// Name and one-line description of a backend, for help output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentationEntry {
    /// Lookup key, for example `unix`.
    pub key: String,
    /// Display name, for example `Unix Makefiles`.
    pub name: String,
    /// One-line description.
    pub brief: String,
}

/// Summary of every built-in backend in catalogue order.
#[must_use]
pub fn documentation_summary() -> Vec<DocumentationEntry> {
    builtin_specs()
        .into_iter()
        .map(|spec| DocumentationEntry {
            key: spec.key,
            name: spec.name,
            brief: spec.brief,
        })
        .collect()
}

/// State produced by [`GeneratorCoordinator::configure`].
#[derive(Debug, Default)]
pub struct ConfiguredProject {
    /// Definitions after seeding, overrides, enablement and expansion.
    pub config: ProjectConfig,
    /// The populated rule graph.
    pub graph: RuleGraph,
    /// Declared and generated sources.
    pub sources: SourceRegistry,
    /// Artifact manifests emitted by declarative commands.
    pub manifests: Vec<ArtifactManifest>,
    /// Utility targets created by declarative commands, in creation order.
    pub wrapped: Vec<String>,
    /// Findings from graph analysis.
    pub report: GraphReport,
}

/// Counts reported by [`GeneratorCoordinator::write_outputs`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    /// Files whose content changed.
    pub written: usize,
    /// Files left untouched.
    pub unchanged: usize,
}

impl WriteSummary {
    const fn record(&mut self, outcome: WriteOutcome) {
        match outcome {
            WriteOutcome::Written => self.written += 1,
            WriteOutcome::Unchanged => self.unchanged += 1,
        }
    }
}

/// Drives one configuration pass for one backend.
#[derive(Debug, Clone)]
pub struct GeneratorCoordinator {
    backend: GeneratorBackend,
    layout: BuildLayout,
}

impl GeneratorCoordinator {
    /// Coordinator rendering with `backend` into `layout`.
    #[must_use]
    pub const fn new(backend: GeneratorBackend, layout: BuildLayout) -> Self {
        Self { backend, layout }
    }

    /// The backend in use.
    #[must_use]
    pub const fn backend(&self) -> &GeneratorBackend {
        &self.backend
    }

    /// The source and build roots.
    #[must_use]
    pub const fn layout(&self) -> &BuildLayout {
        &self.layout
    }

    /// Documentation entry for the active backend.
    #[must_use]
    pub fn documentation(&self) -> DocumentationEntry {
        let profile = self.backend.profile();
        DocumentationEntry {
            key: profile.key().to_owned(),
            name: profile.name().to_owned(),
            brief: profile.brief().to_owned(),
        }
    }

    /// Build the rule graph for `manifest`.
    ///
    /// Definitions are seeded from the manifest, then `overrides` are
    /// applied, then the backend enables the manifest's languages. Any error
    /// aborts the pass; no partial graph is returned.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError`] when directories cannot be ordered, a
    /// declarative command fails, the graph rejects an entry or contains a
    /// cycle.
    pub fn configure(
        &self,
        manifest: &KilnManifest,
        overrides: &[(String, String)],
    ) -> Result<ConfiguredProject, CoordinatorError> {
        let mut project = ConfiguredProject {
            config: ProjectConfig::from_definitions(
                manifest
                    .definitions
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.as_str())),
            ),
            ..ConfiguredProject::default()
        };
        for (key, value) in overrides {
            debug!(%key, %value, "command-line definition");
            project.config.add(key.as_str(), value.as_str());
        }
        project.config.add(SOURCE_DIR, self.layout.source_root.as_str());
        project.config.add(BINARY_DIR, self.layout.binary_root.as_str());
        self.backend
            .enable_language(&manifest.languages, &mut project.config)?;

        for index in order::directory_order(&manifest.directories)? {
            if let Some(directory) = manifest.directories.get(index) {
                self.configure_directory(directory, &mut project)?;
            }
        }

        if !project.wrapped.is_empty() {
            project.graph.enter_directory(".");
            let depends = project.wrapped.iter().map(Utf8PathBuf::from).collect();
            project
                .graph
                .add_utility_target(JAVA_CLASSES_TARGET, depends, true)?;
        }

        project.report = project.graph.analyse(&project.sources)?;
        info!(
            rules = project.graph.rule_count(),
            utilities = project.graph.utility_count(),
            sources = project.sources.len(),
            "configured project"
        );
        Ok(project)
    }

    fn configure_directory(
        &self,
        directory: &Directory,
        project: &mut ConfiguredProject,
    ) -> Result<(), CoordinatorError> {
        let dir = build_dir(&directory.path);
        let source_dir = if dir.as_str().is_empty() {
            self.layout.source_root.clone()
        } else {
            self.layout.source_root.join(dir)
        };
        debug!(directory = %directory.path, "configuring directory");
        project.graph.enter_directory(directory.path.as_path());
        project.sources.enter_directory(directory.path.as_path());

        for decl in &directory.sources {
            let mut file = SourceFile::from_identifier(decl.name(), &source_dir);
            for (name, value) in decl.properties() {
                file.properties.set(name, Some(value));
            }
            project.sources.add(file);
        }

        for invocation in &directory.commands {
            let wrap = |source| CoordinatorError::Command {
                command: invocation.name.clone(),
                directory: directory.path.clone(),
                source,
            };
            let command =
                Command::parse(&invocation.name, &invocation.args, &project.config).map_err(wrap)?;
            let expansion = {
                let ctx = ExpandContext {
                    source_dir: &source_dir,
                    output_dir: dir,
                    config: &project.config,
                };
                command.expand(&ctx, &project.sources).map_err(wrap)?
            };
            let Some(expansion) = expansion else {
                continue;
            };
            expansion.source_list.merge_into(&mut project.config);
            let ctx = ExpandContext {
                source_dir: &source_dir,
                output_dir: dir,
                config: &project.config,
            };
            let finalized = command
                .finalize(&expansion, &ctx, &mut project.graph, &mut project.sources)
                .map_err(wrap)?;
            debug!(command = command.name(), rules = finalized.rules, "finalized command");
            project.manifests.push(expansion.manifest);
            project.wrapped.push(finalized.utility);
        }

        for decl in &directory.rules {
            let rule = build_rule(decl, &directory.path, &source_dir, project)?;
            project.graph.add_rule(rule)?;
        }

        for decl in &directory.targets {
            let identifiers = project.config.expand_arguments(&decl.sources.to_vec())?;
            let sources = identifiers
                .iter()
                .map(|id| {
                    project
                        .sources
                        .lookup(id)
                        .map_or_else(|| source_dir.join(id), SourceFile::full_path)
                })
                .collect();
            project.graph.add_target(&decl.name, sources)?;
        }

        for decl in &directory.utilities {
            let mut depends = Vec::new();
            for item in decl.depends.to_vec() {
                let expanded = project.config.expand_references(&item)?;
                if project.graph.is_named(&expanded) {
                    depends.push(Utf8PathBuf::from(expanded));
                } else {
                    depends.push(resolve_input(&project.graph, dir, &source_dir, &expanded));
                }
            }
            project
                .graph
                .add_utility_target(&decl.name, depends, decl.always)?;
        }
        Ok(())
    }

    /// Render the configured graph.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Generate`] when rendering fails.
    pub fn generate(&self, project: &ConfiguredProject) -> Result<GeneratedFiles, CoordinatorError> {
        Ok(self.backend.render(&project.graph, &project.config)?)
    }

    /// Write rendered files and artifact manifests under the build root.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Io`] when a file cannot be written.
    pub fn write_outputs(
        &self,
        files: &GeneratedFiles,
        manifests: &[ArtifactManifest],
    ) -> Result<WriteSummary, CoordinatorError> {
        let root = &self.layout.binary_root;
        let mut summary = WriteSummary::default();
        for (path, content) in files.iter() {
            summary.record(write_if_changed(&root.join(path), content)?);
        }
        for manifest in manifests {
            summary.record(write_if_changed(&root.join(manifest.path()), &manifest.render())?);
        }
        info!(
            written = summary.written,
            unchanged = summary.unchanged,
            root = %root,
            "generation finished"
        );
        Ok(summary)
    }
}

/// Build-tree prefix for a directory; the root maps to an empty prefix so
/// its paths stay bare.
fn build_dir(path: &Utf8Path) -> &Utf8Path {
    if path == "." {
        Utf8Path::new("")
    } else {
        path
    }
}

/// Output paths live in the build tree under the directory's path.
fn output_path(dir: &Utf8Path, output: &str) -> Utf8PathBuf {
    let path = Utf8Path::new(output);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        dir.join(path)
    }
}

/// An input produced by an earlier rule resolves to the build tree;
/// anything else is a file in the source directory.
fn resolve_input(graph: &RuleGraph, dir: &Utf8Path, source_dir: &Utf8Path, input: &str) -> Utf8PathBuf {
    let path = Utf8Path::new(input);
    if path.is_absolute() {
        return path.to_path_buf();
    }
    let built = dir.join(path);
    if graph.resolve_dependents(&built).is_some() {
        built
    } else {
        source_dir.join(path)
    }
}

fn build_rule(
    decl: &RuleDecl,
    directory: &Utf8Path,
    source_dir: &Utf8Path,
    project: &ConfiguredProject,
) -> Result<Rule, CoordinatorError> {
    let dir = build_dir(directory);
    let config = &project.config;
    let outputs = decl
        .outputs
        .to_vec()
        .iter()
        .map(|o| config.expand_references(o).map(|e| output_path(dir, &e)))
        .collect::<Result<Vec<_>, _>>()?;
    let inputs = decl
        .inputs
        .to_vec()
        .iter()
        .map(|i| {
            config
                .expand_references(i)
                .map(|e| resolve_input(&project.graph, dir, source_dir, &e))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let mut commands = Vec::with_capacity(decl.commands.len());
    for spec in &decl.commands {
        let tokens = match spec {
            CommandSpec::Line(line) => {
                let expanded = config.expand_references(line)?;
                shlex::split(&expanded).ok_or_else(|| CoordinatorError::InvalidCommandLine {
                    directory: directory.to_path_buf(),
                    line: line.clone(),
                })?
            }
            CommandSpec::Tokens(tokens) => tokens
                .iter()
                .map(|t| config.expand_references(t))
                .collect::<Result<Vec<_>, _>>()?,
        };
        commands.push(tokens);
    }
    let mut rule = Rule::new(outputs, commands)
        .with_inputs(inputs)
        .always_build(decl.always);
    if let Some(wd) = &decl.working_dir {
        rule = rule.with_working_dir(output_path(dir, wd.as_str()));
    }
    if let Some(comment) = &decl.comment {
        rule = rule.with_comment(config.expand_references(comment)?);
    }
    Ok(rule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::profile::builtin;
    use crate::manifest;
    use rstest::{fixture, rstest};

    #[fixture]
    fn coordinator() -> GeneratorCoordinator {
        GeneratorCoordinator::new(
            GeneratorBackend::new(builtin("unix").expect("unix profile")),
            BuildLayout {
                source_root: "/src".into(),
                binary_root: "/build".into(),
            },
        )
    }

    const WRAPPED: &str = r#"
kiln_version: 1.0.0
languages: [cxx]
definitions:
  WRAP_JAVA: "ON"
  WRAP_JAVA_HOME: /java
  WRAP_JAVA_EXE: /bin/wrap
  PARSE_JAVA_EXE: /bin/parse
directories:
  - path: app
    depends_on: [common]
    utilities:
      - name: everything
        depends: [vtkCommonJavaClasses]
  - path: common
    sources:
      - Foo.cxx
      - name: Bar.cxx
        properties: { WRAP_EXCLUDE: "1" }
    commands:
      - wrap_java: [vtkCommon, Common_SRCS, Foo, Bar]
    targets:
      - name: vtkCommon
        sources: ["${Common_SRCS}"]
"#;

    #[rstest]
    fn wraps_sources_and_adds_umbrella(coordinator: GeneratorCoordinator) {
        let manifest = manifest::from_str(WRAPPED).expect("manifest");
        let project = coordinator.configure(&manifest, &[]).expect("configure");

        assert_eq!(project.graph.rule_count(), 2);
        assert_eq!(project.config.get("Common_SRCS"), Some("FooJava.cxx"));
        assert_eq!(project.wrapped, ["vtkCommonJavaClasses"]);
        let names: Vec<_> = project.graph.utilities().map(|u| u.name.as_str()).collect();
        assert_eq!(names, ["vtkCommonJavaClasses", "everything", JAVA_CLASSES_TARGET]);
        let target = project.graph.targets().next().expect("target");
        assert_eq!(target.sources, [Utf8PathBuf::from("common/FooJava.cxx")]);
        assert_eq!(project.manifests.len(), 1);
    }

    #[rstest]
    fn sources_of_other_directories_are_not_consulted(coordinator: GeneratorCoordinator) {
        let yaml = r#"
kiln_version: 1.0.0
definitions:
  WRAP_JAVA: "ON"
  WRAP_JAVA_HOME: /java
  WRAP_JAVA_EXE: /bin/wrap
  PARSE_JAVA_EXE: /bin/parse
directories:
  - path: a
    sources:
      - name: Bar.cxx
        properties: { WRAP_EXCLUDE: "1", ABSTRACT: "1" }
  - path: b
    commands:
      - wrap_java: [libB, B_SRCS, Bar]
"#;
        let manifest = manifest::from_str(yaml).expect("manifest");
        let project = coordinator.configure(&manifest, &[]).expect("configure");
        assert_eq!(project.config.get("B_SRCS"), Some("BarJava.cxx"));
        assert_eq!(project.graph.rule_count(), 2);
        let generated = project
            .sources
            .iter()
            .find(|s| s.name == "BarJava")
            .expect("generated source");
        assert!(!generated.get_property_as_bool("ABSTRACT"));
    }

    #[rstest]
    fn overrides_win_over_manifest_definitions(coordinator: GeneratorCoordinator) {
        let manifest = manifest::from_str(WRAPPED).expect("manifest");
        let project = coordinator
            .configure(&manifest, &[("WRAP_JAVA".into(), "OFF".into())])
            .expect("configure");
        assert_eq!(project.graph.rule_count(), 0);
        assert!(project.manifests.is_empty());
        assert!(!project.graph.is_named(JAVA_CLASSES_TARGET));
    }

    #[rstest]
    fn command_errors_name_command_and_directory(coordinator: GeneratorCoordinator) {
        let yaml = "kiln_version: 1.0.0\ndirectories:\n  - path: lib\n    commands:\n      - wrap_java: [onlyone]\n";
        let manifest = manifest::from_str(yaml).expect("manifest");
        let err = coordinator.configure(&manifest, &[]).expect_err("arity");
        assert!(matches!(
            err,
            CoordinatorError::Command { ref command, ref directory, .. }
                if command == "wrap_java" && directory.as_str() == "lib"
        ));
    }

    #[rstest]
    fn rule_inputs_prefer_earlier_outputs(coordinator: GeneratorCoordinator) {
        let yaml = r#"
kiln_version: 1.0.0
definitions: { GEN: /bin/gen }
directories:
  - path: .
    rules:
      - outputs: a.h
        inputs: a.h.in
        commands: ["${GEN} a.h.in a.h"]
      - outputs: b.h
        inputs: [a.h]
        commands: [[cp, a.h, b.h]]
"#;
        let manifest = manifest::from_str(yaml).expect("manifest");
        let project = coordinator.configure(&manifest, &[]).expect("configure");
        let rules: Vec<_> = project.graph.rules().map(|(_, r)| r.clone()).collect();
        let first = rules.first().expect("first rule");
        assert_eq!(first.inputs, [Utf8PathBuf::from("/src/a.h.in")]);
        assert_eq!(
            first.commands,
            [vec!["/bin/gen".to_owned(), "a.h.in".into(), "a.h".into()]]
        );
        let second = rules.get(1).expect("second rule");
        assert_eq!(second.inputs, [Utf8PathBuf::from("a.h")]);
    }

    #[rstest]
    fn unsplittable_lines_are_rejected(coordinator: GeneratorCoordinator) {
        let yaml = "kiln_version: 1.0.0\ndirectories:\n  - path: .\n    rules:\n      - outputs: x\n        commands: [\"echo 'open\"]\n";
        let manifest = manifest::from_str(yaml).expect("manifest");
        let err = coordinator.configure(&manifest, &[]).expect_err("split");
        assert!(matches!(err, CoordinatorError::InvalidCommandLine { .. }));
    }

    #[rstest]
    fn active_backend_is_documented(coordinator: GeneratorCoordinator) {
        let entry = coordinator.documentation();
        assert_eq!(entry.key, "unix");
        assert_eq!(coordinator.backend().profile().name(), entry.name);
        assert_eq!(coordinator.layout().binary_root.as_str(), "/build");
    }

    #[rstest]
    fn documentation_lists_every_builtin() {
        let keys: Vec<_> = documentation_summary().into_iter().map(|e| e.key).collect();
        assert_eq!(keys, ["unix", "watcom", "nmake", "mingw"]);
    }
}
