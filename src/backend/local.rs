//! Per-directory rendering.
//!
//! A [`LocalContext`] renders the fragment for one directory scope. It holds
//! only shared references, so contexts for different directories never share
//! mutable state.

use std::fmt::Write;

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use itertools::Itertools;

use super::GenerateError;
use super::mangle::{object_name, render_object};
use super::profile::{BackendProfile, SymbolicStyle};
use super::quote::{echo_text, escape_make, make_path, native_path, quote_token, shell_path};
use crate::graph::{CommandLine, DirectoryScope, Rule, RuleGraph, ScopeItem, Target, UtilityTarget};

/// Rendering context for one directory.
#[derive(Debug, Clone)]
pub struct LocalContext<'a> {
    directory: Utf8PathBuf,
    source_dir: Option<Utf8PathBuf>,
    profile: &'a BackendProfile,
}

impl<'a> LocalContext<'a> {
    /// Context for `directory` using `profile`.
    #[must_use]
    pub fn new(directory: impl Into<Utf8PathBuf>, profile: &'a BackendProfile) -> Self {
        Self {
            directory: directory.into(),
            source_dir: None,
            profile,
        }
    }

    /// Attach the source directory matching this scope under `root`.
    ///
    /// Object names of declared sources are computed relative to it.
    #[must_use]
    pub fn with_source_root(mut self, root: &Utf8Path) -> Self {
        self.source_dir = Some(if self.is_root() {
            root.to_path_buf()
        } else {
            root.join(&self.directory)
        });
        self
    }

    fn is_root(&self) -> bool {
        self.directory.as_str() == "." || self.directory.as_str().is_empty()
    }

    /// Directory this context renders.
    #[must_use]
    pub fn directory(&self) -> &Utf8Path {
        &self.directory
    }

    /// Profile in effect.
    #[must_use]
    pub const fn profile(&self) -> &'a BackendProfile {
        self.profile
    }

    /// Fragment path relative to the build root.
    #[must_use]
    pub fn fragment_path(&self) -> Utf8PathBuf {
        if self.is_root() {
            Utf8PathBuf::from(self.profile.fragment_file())
        } else {
            self.directory.join(self.profile.fragment_file())
        }
    }

    /// Render every entry of `scope` in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError`] when a command cannot be quoted.
    pub fn render_scope(
        &self,
        graph: &RuleGraph,
        scope: &DirectoryScope,
    ) -> Result<String, GenerateError> {
        let mut out = String::new();
        writeln!(out, "# Build rules for directory {}", self.directory)?;
        for item in scope.items() {
            writeln!(out)?;
            match *item {
                ScopeItem::Rule(id) => {
                    if let Some(rule) = graph.rule(id) {
                        self.render_rule(&mut out, rule)?;
                    }
                }
                ScopeItem::Target(id) => {
                    if let Some(target) = graph.target(id) {
                        self.render_target(&mut out, target)?;
                    }
                }
                ScopeItem::Utility(id) => {
                    if let Some(utility) = graph.utility(id) {
                        self.render_utility(&mut out, utility)?;
                    }
                }
            }
        }
        Ok(out)
    }

    /// Render one rule with its recipe and secondary outputs.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError`] when a command cannot be quoted.
    pub fn render_rule(&self, out: &mut String, rule: &Rule) -> Result<(), GenerateError> {
        let Some((primary, secondary)) = rule.outputs.split_first() else {
            return Ok(());
        };
        if let Some(comment) = &rule.comment {
            writeln!(out, "# {comment}")?;
        }
        let deps: Vec<String> = rule
            .inputs
            .iter()
            .map(|p| make_path(self.profile, p))
            .collect();
        let name = make_path(self.profile, primary);
        self.write_dependencies(out, &name, rule.always_build, &deps)?;
        if let Some(comment) = &rule.comment {
            writeln!(out, "\t@echo {}", escape_make(&echo_text(self.profile, comment)?))?;
        }
        let silent = if self.profile.echo_commands() { "" } else { "@" };
        match &rule.working_dir {
            Some(dir) if self.profile.unix_cd() => {
                let cd = shell_path(self.profile, dir)?;
                for command in &rule.commands {
                    let line = self.command_line(command)?;
                    writeln!(out, "\t{silent}cd {} && {}", escape_make(&cd), line)?;
                }
            }
            Some(dir) => {
                let cd = shell_path(self.profile, dir)?;
                writeln!(out, "\t{silent}cd {}", escape_make(&cd))?;
                for command in &rule.commands {
                    writeln!(out, "\t{silent}{}", self.command_line(command)?)?;
                }
            }
            None => {
                for command in &rule.commands {
                    writeln!(out, "\t{silent}{}", self.command_line(command)?)?;
                }
            }
        }
        for output in secondary {
            writeln!(out)?;
            writeln!(out, "{}: {name}", make_path(self.profile, output))?;
        }
        Ok(())
    }

    /// Render a real target with its source and object lists.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::Format`] when writing fails.
    pub fn render_target(&self, out: &mut String, target: &Target) -> Result<(), GenerateError> {
        let sources: Vec<String> = target
            .sources
            .iter()
            .map(|p| make_path(self.profile, p))
            .collect();
        let objects: Vec<String> = target
            .sources
            .iter()
            .map(|p| {
                let object = object_name(self.profile, &target.name, &self.relative(p));
                escape_make(&render_object(self.profile, &object))
            })
            .collect();
        self.write_list(out, &format!("{}_SOURCES", target.name), &sources)?;
        writeln!(out)?;
        self.write_list(out, &format!("{}_OBJECTS", target.name), &objects)?;
        writeln!(out)?;
        let deps = [format!("$({}_SOURCES)", target.name)];
        self.write_dependencies(out, &target.name, true, &deps)
    }

    /// Render a utility target.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::Format`] when writing fails.
    pub fn render_utility(
        &self,
        out: &mut String,
        utility: &UtilityTarget,
    ) -> Result<(), GenerateError> {
        let deps: Vec<String> = utility
            .depends
            .iter()
            .map(|p| make_path(self.profile, p))
            .collect();
        self.write_dependencies(out, &utility.name, utility.always_out_of_date, &deps)
    }

    /// Write `target: deps`, folding long dependency lists with the
    /// profile's continuation token.
    pub(crate) fn write_dependencies(
        &self,
        out: &mut String,
        target: &str,
        symbolic: bool,
        deps: &[String],
    ) -> Result<(), GenerateError> {
        let marker = match self.profile.symbolic() {
            SymbolicStyle::Declaration(token) if symbolic => {
                writeln!(out, "{token}: {target}")?;
                None
            }
            SymbolicStyle::Attribute(token) if symbolic => Some(token.as_str()),
            _ => None,
        };
        write!(out, "{target}:")?;
        if let Some(token) = marker {
            write!(out, " {token}")?;
        }
        match deps {
            [] => writeln!(out)?,
            [single] => writeln!(out, " {single}")?,
            many => {
                let continuation = self.profile.line_continuation();
                writeln!(out, " {continuation}")?;
                let body = many
                    .iter()
                    .map(|dep| format!("  {dep}"))
                    .join(&format!(" {continuation}\n"));
                writeln!(out, "{body}")?;
            }
        }
        Ok(())
    }

    fn write_list(&self, out: &mut String, name: &str, items: &[String]) -> Result<(), GenerateError> {
        if items.is_empty() {
            writeln!(out, "{name} =")?;
            return Ok(());
        }
        let continuation = self.profile.line_continuation();
        writeln!(out, "{name} = {continuation}")?;
        let body = items
            .iter()
            .map(|item| format!("  {item}"))
            .join(&format!(" {continuation}\n"));
        writeln!(out, "{body}")?;
        Ok(())
    }

    /// Quote a command invocation; the program path gets native separators.
    fn command_line(&self, command: &CommandLine) -> Result<String, GenerateError> {
        let shell = self.profile.shell();
        let mut tokens = Vec::with_capacity(command.len());
        for (index, token) in command.iter().enumerate() {
            let quoted = if index == 0 {
                quote_token(shell, &native_path(self.profile, token))?
            } else {
                quote_token(shell, token)?
            };
            tokens.push(quoted);
        }
        Ok(escape_make(&tokens.join(" ")))
    }

    /// Path of a target source below this scope's source or build
    /// directory. Anything outside both keeps its full path with the root
    /// dropped and `..` spelled `__`, so objects stay under `<target>.dir`.
    fn relative(&self, path: &Utf8Path) -> Utf8PathBuf {
        let stripped = self
            .source_dir
            .as_deref()
            .and_then(|dir| path.strip_prefix(dir).ok())
            .or_else(|| path.strip_prefix(&self.directory).ok())
            .unwrap_or(path);
        stripped
            .components()
            .filter_map(|component| match component {
                Utf8Component::Normal(part) => Some(part),
                Utf8Component::ParentDir => Some("__"),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::profile::{ShellStyle, builtin};
    use rstest::rstest;

    fn render_rule(backend: &str, rule: &Rule) -> String {
        let profile = builtin(backend).expect("profile");
        let ctx = LocalContext::new("src", &profile);
        let mut out = String::new();
        ctx.render_rule(&mut out, rule).expect("render");
        out
    }

    #[rstest]
    fn unix_rule_uses_cd_chain_and_continuations() {
        let rule = Rule::new(
            vec!["out/FooJava.cxx".into(), "out/FooJava.h".into()],
            vec![vec!["wrap".into(), "Foo.h".into(), "$X".into()]],
        )
        .with_inputs(vec!["wrap".into(), "src/Foo.h".into()])
        .with_working_dir("out")
        .with_comment("Java Wrapping - generating FooJava.cxx");

        let echo = quote_token(ShellStyle::Posix, "Java Wrapping - generating FooJava.cxx")
            .expect("quote");
        let var = quote_token(ShellStyle::Posix, "$X").expect("quote");
        let expected = format!(
            concat!(
                "# Java Wrapping - generating FooJava.cxx\n",
                "out/FooJava.cxx: \\\n",
                "  wrap \\\n",
                "  src/Foo.h\n",
                "\t@echo {echo}\n",
                "\tcd out && wrap Foo.h {var}\n",
                "\n",
                "out/FooJava.h: out/FooJava.cxx\n",
            ),
            echo = escape_make(&echo),
            var = escape_make(&var),
        );
        assert_eq!(render_rule("unix", &rule), expected);
    }

    #[rstest]
    fn watcom_rule_uses_symbolic_attribute_and_separate_cd() {
        let rule = Rule::new(
            vec!["stamp".into()],
            vec![vec!["tools/touch.exe".into(), "stamp".into()]],
        )
        .with_inputs(vec!["a".into(), "b".into()])
        .with_working_dir("out/dir")
        .always_build(true);

        let expected = concat!(
            "stamp: .SYMBOLIC &\n",
            "  a &\n",
            "  b\n",
            "\tcd out\\dir\n",
            "\ttools\\touch.exe stamp\n",
        );
        assert_eq!(render_rule("watcom", &rule), expected);
    }

    #[rstest]
    fn unix_utility_is_declared_phony() {
        let profile = builtin("unix").expect("profile");
        let ctx = LocalContext::new(".", &profile);
        let utility = UtilityTarget {
            name: "vtkJavaClasses".into(),
            depends: vec!["java/Foo.java".into()],
            always_out_of_date: true,
        };
        let mut out = String::new();
        ctx.render_utility(&mut out, &utility).expect("render");
        assert_eq!(out, ".PHONY: vtkJavaClasses\nvtkJavaClasses: java/Foo.java\n");
    }

    #[rstest]
    fn target_lists_sources_and_objects() {
        let profile = builtin("unix").expect("profile");
        let ctx = LocalContext::new("src", &profile);
        let target = Target {
            name: "app".into(),
            sources: vec!["src/main.c".into(), "src/util.c".into()],
        };
        let mut out = String::new();
        ctx.render_target(&mut out, &target).expect("render");
        let expected = concat!(
            "app_SOURCES = \\\n",
            "  src/main.c \\\n",
            "  src/util.c\n",
            "\n",
            "app_OBJECTS = \\\n",
            "  app.dir/main.o \\\n",
            "  app.dir/util.o\n",
            "\n",
            ".PHONY: app\n",
            "app: $(app_SOURCES)\n",
        );
        assert_eq!(out, expected);
    }

    #[rstest]
    fn declared_and_generated_sources_share_object_layout() {
        let profile = builtin("unix").expect("profile");
        let ctx = LocalContext::new("common", &profile).with_source_root(Utf8Path::new("/src"));
        let target = Target {
            name: "vtkCommon".into(),
            sources: vec![
                "/src/common/vtkObject.cxx".into(),
                "common/vtkObjectJava.cxx".into(),
                "/opt/extra/Shared.cxx".into(),
            ],
        };
        let mut out = String::new();
        ctx.render_target(&mut out, &target).expect("render");
        assert!(out.contains(concat!(
            "vtkCommon_OBJECTS = \\\n",
            "  vtkCommon.dir/vtkObject.o \\\n",
            "  vtkCommon.dir/vtkObjectJava.o \\\n",
            "  vtkCommon.dir/opt/extra/Shared.o\n",
        )), "{out}");
    }

    #[rstest]
    fn root_scope_strips_the_source_root() {
        let profile = builtin("unix").expect("profile");
        let ctx = LocalContext::new(".", &profile).with_source_root(Utf8Path::new("/src"));
        let target = Target {
            name: "app".into(),
            sources: vec!["/src/main.c".into(), "/src/../shared/util.c".into()],
        };
        let mut out = String::new();
        ctx.render_target(&mut out, &target).expect("render");
        assert!(out.contains("  app.dir/main.o \\\n  app.dir/__/shared/util.o\n"), "{out}");
    }

    #[rstest]
    #[case(".", "build.make")]
    #[case("src/lib", "src/lib/build.make")]
    fn fragment_path_is_relative_to_build_root(#[case] dir: &str, #[case] expected: &str) {
        let profile = builtin("unix").expect("profile");
        assert_eq!(LocalContext::new(dir, &profile).fragment_path(), expected);
    }
}
