//! `wrap_java`: generate Java bindings for a list of C++ classes.
//!
//! For every class `Foo` the command produces `FooJava.cxx` (compiled into
//! the library) and `Foo.java` (collected by a packaging step). Both are
//! derived from the class header `<source dir>/Foo.h`.
//!
//! ```yaml
//! commands:
//!   - wrap_java: [vtkCommon, COMMON_JAVA_SRCS, "${COMMON_CLASSES}"]
//! ```
//!
//! The command is inert unless `WRAP_JAVA` is on. It reads:
//!
//! | Definition       | Required | Meaning                              |
//! |------------------|----------|--------------------------------------|
//! | `WRAP_JAVA_HOME` | yes      | directory receiving `.java` files    |
//! | `WRAP_JAVA_EXE`  | yes      | tool generating the `.cxx` wrapper   |
//! | `PARSE_JAVA_EXE` | yes      | tool generating the `.java` class    |
//! | `WRAP_HINTS`     | no       | hints file passed to both tools      |
//!
//! Sources with the `WRAP_EXCLUDE` property are skipped; `ABSTRACT` selects
//! the abstract-class flag handed to the tools.

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, info};

use super::artifacts::{ArtifactManifest, JAVA_DEPENDENCIES_FILE};
use super::{ExpandContext, ExpandError, Expansion, Finalized, SourceListUpdate};
use crate::config::ProjectConfig;
use crate::graph::{CommandLine, Rule, RuleGraph};
use crate::sources::{SourceFile, SourceRegistry};

const GATE: &str = "WRAP_JAVA";
const JAVA_HOME: &str = "WRAP_JAVA_HOME";
const WRAP_EXE: &str = "WRAP_JAVA_EXE";
const PARSE_EXE: &str = "PARSE_JAVA_EXE";
const HINTS: &str = "WRAP_HINTS";
const EXCLUDE: &str = "WRAP_EXCLUDE";
const ABSTRACT: &str = "ABSTRACT";
const SUFFIX: &str = "Java";

/// Parsed `wrap_java` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapJava {
    library: String,
    source_list: String,
    sources: Vec<String>,
}

/// One class scheduled for wrapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapEntry {
    /// Class name, i.e. the source stem.
    pub class: String,
    /// Generated wrapper source.
    pub generated: SourceFile,
    /// Header the wrapper is generated from.
    pub header: Utf8PathBuf,
    /// Java class written to the artifact directory.
    pub artifact: Utf8PathBuf,
}

impl WrapEntry {
    /// Path of the generated wrapper source.
    #[must_use]
    pub fn output(&self) -> Utf8PathBuf {
        self.generated.full_path()
    }

    /// Whether the wrapped class is abstract.
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.generated.get_property_as_bool(ABSTRACT)
    }
}

struct Tools {
    wrap: String,
    parse: String,
    hints: Option<String>,
}

impl Tools {
    fn resolve(config: &ProjectConfig) -> Result<Self, ExpandError> {
        Ok(Self {
            wrap: config.get_required(WRAP_EXE)?.to_owned(),
            parse: config.get_required(PARSE_EXE)?.to_owned(),
            hints: config.get(HINTS).map(str::to_owned),
        })
    }

    fn depends(&self, tool: &str, header: &Utf8Path) -> Vec<Utf8PathBuf> {
        let mut inputs = vec![Utf8PathBuf::from(tool)];
        inputs.extend(self.hints.iter().map(Utf8PathBuf::from));
        inputs.push(header.to_path_buf());
        inputs
    }

    fn command(&self, tool: &str, entry: &WrapEntry, output: &Utf8Path) -> CommandLine {
        let mut line = vec![tool.to_owned(), entry.header.to_string()];
        line.extend(self.hints.iter().cloned());
        line.push(if entry.is_abstract() { "0" } else { "1" }.to_owned());
        line.push(output.to_string());
        line
    }
}

impl WrapJava {
    /// Name used in the project file.
    pub const NAME: &'static str = "wrap_java";

    /// Parse `[library, source_list, sources...]`.
    ///
    /// The library and source list names are taken literally. Source
    /// arguments are list-expanded: `${NAME}` splices a list.
    ///
    /// # Errors
    ///
    /// Returns [`ExpandError::Argument`] for fewer than three arguments and
    /// [`ExpandError::Config`] when a list reference cannot be resolved.
    pub fn parse(args: &[String], config: &ProjectConfig) -> Result<Self, ExpandError> {
        let [library, source_list, rest @ ..] = args else {
            return Err(argument_error("called with incorrect number of arguments"));
        };
        if rest.is_empty() {
            return Err(argument_error("called with incorrect number of arguments"));
        }
        Ok(Self {
            library: library.clone(),
            source_list: source_list.clone(),
            sources: config.expand_arguments(rest)?,
        })
    }

    /// Library the wrappers belong to.
    #[must_use]
    pub fn library(&self) -> &str {
        &self.library
    }

    /// Name of the source list extended with generated wrappers.
    #[must_use]
    pub fn source_list(&self) -> &str {
        &self.source_list
    }

    /// Source identifiers after list expansion.
    #[must_use]
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Name of the utility target aggregating the Java classes.
    #[must_use]
    pub fn utility_name(&self) -> String {
        format!("{}JavaClasses", self.library)
    }

    /// Expansion step: decide what to wrap without touching the graph.
    ///
    /// Returns `Ok(None)` when `WRAP_JAVA` is off.
    ///
    /// # Errors
    ///
    /// Returns [`ExpandError::Config`] when `WRAP_JAVA_HOME` is not defined.
    pub fn expand(
        &self,
        ctx: &ExpandContext<'_>,
        sources: &SourceRegistry,
    ) -> Result<Option<Expansion>, ExpandError> {
        if !ctx.config.is_on(GATE) {
            debug!(library = %self.library, "{GATE} is off; skipping");
            return Ok(None);
        }
        let java_home = Utf8PathBuf::from(ctx.config.get_required(JAVA_HOME)?);
        let mut manifest = ArtifactManifest::new(
            ctx.output_dir.join(JAVA_DEPENDENCIES_FILE),
            Self::NAME,
            "JAVA_DEPENDENCIES",
        );
        let mut entries = Vec::new();
        for identifier in &self.sources {
            let tracked = sources.lookup(identifier);
            let Some(entry) = Self::expand_source(ctx, &java_home, identifier, tracked) else {
                continue;
            };
            manifest.push(entry.artifact.clone());
            entries.push(entry);
        }
        let items = entries.iter().map(|e| e.generated.file_name()).collect();
        Ok(Some(Expansion {
            entries,
            source_list: SourceListUpdate {
                list: self.source_list.clone(),
                items,
            },
            manifest,
        }))
    }

    /// Plan the wrapper for one source; `None` when it is excluded.
    ///
    /// An identifier with no tracked source is still wrapped under its
    /// literal name, without property propagation.
    #[must_use]
    pub fn expand_source(
        ctx: &ExpandContext<'_>,
        java_home: &Utf8Path,
        identifier: &str,
        tracked: Option<&SourceFile>,
    ) -> Option<WrapEntry> {
        if tracked.is_some_and(|file| file.get_property_as_bool(EXCLUDE)) {
            debug!(%identifier, "excluded from wrapping");
            return None;
        }
        let class = Utf8Path::new(identifier)
            .file_stem()
            .unwrap_or(identifier)
            .to_owned();
        let header = ctx.source_dir.join(format!("{class}.h"));
        let mut generated = SourceFile::new(format!("{class}{SUFFIX}"), ctx.output_dir, "cxx");
        generated.generated = true;
        generated.depends.push(header.clone());
        if let Some(file) = tracked {
            generated.properties.set(ABSTRACT, file.properties.get(ABSTRACT));
        } else {
            debug!(%identifier, "wrapping untracked source by name");
        }
        Some(WrapEntry {
            artifact: java_home.join(format!("{class}.java")),
            class,
            generated,
            header,
        })
    }

    /// Finalization step: two rules per entry plus the aggregating utility.
    ///
    /// Tool paths are resolved once for the whole library.
    ///
    /// # Errors
    ///
    /// Returns [`ExpandError::Config`] when a tool path is not defined and
    /// [`ExpandError::Graph`] when the graph rejects a rule or the utility.
    pub fn finalize(
        &self,
        entries: &[WrapEntry],
        ctx: &ExpandContext<'_>,
        graph: &mut RuleGraph,
        sources: &mut SourceRegistry,
    ) -> Result<Finalized, ExpandError> {
        let tools = Tools::resolve(ctx.config)?;
        let mut artifacts = Vec::with_capacity(entries.len());
        let mut rules = 0;
        for entry in entries {
            let output = entry.output();
            graph.add_rule(
                Rule::new(
                    vec![output.clone()],
                    vec![tools.command(&tools.wrap, entry, &output)],
                )
                .with_inputs(tools.depends(&tools.wrap, &entry.header)),
            )?;
            graph.add_rule(
                Rule::new(
                    vec![entry.artifact.clone()],
                    vec![tools.command(&tools.parse, entry, &entry.artifact)],
                )
                .with_inputs(tools.depends(&tools.parse, &entry.header)),
            )?;
            rules += 2;
            sources.add(entry.generated.clone());
            artifacts.push(entry.artifact.clone());
        }
        let utility = self.utility_name();
        graph.add_utility_target(&utility, artifacts, true)?;
        info!(library = %self.library, classes = entries.len(), "wrapped Java classes");
        Ok(Finalized { rules, utility })
    }
}

fn argument_error(message: &str) -> ExpandError {
    ExpandError::Argument {
        command: WrapJava::NAME.to_owned(),
        message: message.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use rstest::{fixture, rstest};

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_owned()).collect()
    }

    #[fixture]
    fn config() -> ProjectConfig {
        ProjectConfig::from_definitions([
            ("WRAP_JAVA", "ON"),
            ("WRAP_JAVA_HOME", "/java"),
            ("WRAP_JAVA_EXE", "/bin/wrap"),
            ("PARSE_JAVA_EXE", "/bin/parse"),
        ])
    }

    fn context(config: &ProjectConfig) -> ExpandContext<'_> {
        ExpandContext {
            source_dir: Utf8Path::new("/src/common"),
            output_dir: Utf8Path::new("/build/common"),
            config,
        }
    }

    #[rstest]
    #[case(&[])]
    #[case(&["lib"])]
    #[case(&["lib", "SRCS"])]
    fn too_few_arguments_are_rejected(config: ProjectConfig, #[case] raw: &[&str]) {
        let err = WrapJava::parse(&args(raw), &config).expect_err("arity");
        assert!(matches!(err, ExpandError::Argument { .. }));
    }

    #[rstest]
    fn unresolved_source_list_reference_fails(config: ProjectConfig) {
        let err = WrapJava::parse(&args(&["lib", "SRCS", "${CLASSES}"]), &config)
            .expect_err("unresolved");
        assert_eq!(
            err,
            ExpandError::Config(ConfigError::UnresolvedList {
                name: "CLASSES".into()
            })
        );
    }

    #[rstest]
    fn list_references_are_spliced(mut config: ProjectConfig) {
        config.add("CLASSES", "Foo.cxx;Bar.cxx");
        let cmd = WrapJava::parse(&args(&["lib", "SRCS", "${CLASSES}", "Baz"]), &config)
            .expect("parse");
        assert_eq!(cmd.library(), "lib");
        assert_eq!(cmd.source_list(), "SRCS");
        assert_eq!(cmd.sources(), ["Foo.cxx", "Bar.cxx", "Baz"]);
    }

    #[rstest]
    fn library_and_list_names_are_literal(mut config: ProjectConfig) {
        config.add("LIBS", "a;b");
        let cmd = WrapJava::parse(&args(&["${LIBS}", "A;B", "Foo"]), &config).expect("parse");
        assert_eq!(cmd.library(), "${LIBS}");
        assert_eq!(cmd.source_list(), "A;B");
        assert_eq!(cmd.sources(), ["Foo"]);
    }

    #[rstest]
    fn gate_off_expands_nothing() {
        let config = ProjectConfig::new();
        let cmd = WrapJava::parse(&args(&["lib", "SRCS", "Foo"]), &config).expect("parse");
        let expansion = cmd
            .expand(&context(&config), &SourceRegistry::new())
            .expect("expand");
        assert!(expansion.is_none());
    }

    #[rstest]
    fn untracked_source_is_wrapped_by_name(config: ProjectConfig) {
        let ctx = context(&config);
        let entry =
            WrapJava::expand_source(&ctx, Utf8Path::new("/java"), "Foo", None).expect("entry");
        assert_eq!(entry.output(), "/build/common/FooJava.cxx");
        assert_eq!(entry.header, "/src/common/Foo.h");
        assert_eq!(entry.artifact, "/java/Foo.java");
        assert!(entry.generated.properties.get(ABSTRACT).is_none());
    }

    #[rstest]
    fn abstract_property_selects_flag(config: ProjectConfig) {
        let mut tracked = SourceFile::new("Shape", "/src/common", "cxx");
        tracked.properties.set(ABSTRACT, Some("1"));
        let ctx = context(&config);
        let entry = WrapJava::expand_source(&ctx, Utf8Path::new("/java"), "Shape", Some(&tracked))
            .expect("entry");
        let tools = Tools::resolve(&config).expect("tools");
        assert_eq!(
            tools.command("/bin/wrap", &entry, &entry.output()),
            args(&[
                "/bin/wrap",
                "/src/common/Shape.h",
                "0",
                "/build/common/ShapeJava.cxx"
            ])
        );
    }

    #[rstest]
    fn hints_are_passed_and_depended_on(mut config: ProjectConfig) {
        config.add("WRAP_HINTS", "/src/hints");
        let tools = Tools::resolve(&config).expect("tools");
        assert_eq!(
            tools.depends("/bin/parse", Utf8Path::new("/src/Foo.h")),
            vec![
                Utf8PathBuf::from("/bin/parse"),
                Utf8PathBuf::from("/src/hints"),
                Utf8PathBuf::from("/src/Foo.h"),
            ]
        );
    }

    #[rstest]
    fn missing_tool_definition_fails_finalize() {
        let config = ProjectConfig::from_definitions([
            ("WRAP_JAVA", "ON"),
            ("WRAP_JAVA_HOME", "/java"),
            ("WRAP_JAVA_EXE", "/bin/wrap"),
        ]);
        let cmd = WrapJava::parse(&args(&["lib", "SRCS", "Foo"]), &config).expect("parse");
        let ctx = context(&config);
        let expansion = cmd
            .expand(&ctx, &SourceRegistry::new())
            .expect("expand")
            .expect("enabled");
        let mut graph = RuleGraph::new();
        let err = cmd
            .finalize(&expansion.entries, &ctx, &mut graph, &mut SourceRegistry::new())
            .expect_err("missing tool");
        assert_eq!(
            err,
            ExpandError::Config(ConfigError::MissingRequiredDefinition {
                key: "PARSE_JAVA_EXE".into()
            })
        );
        assert_eq!(graph.rule_count(), 0);
    }
}
