//! Kiln project file Abstract Syntax Tree structures.
//!
//! This module defines the data structures used to represent a parsed
//! `Kilnfile`. They mirror the YAML schema and are deserialised with
//! `serde_saphyr`; unknown keys are rejected everywhere.
//!
//! ```rust
//! use kiln::ast::KilnManifest;
//!
//! let yaml = concat!(
//!     "kiln_version: \"1.0.0\"\n",
//!     "languages: [cxx]\n",
//!     "directories:\n",
//!     "  - path: common\n",
//!     "    sources: [Foo.cxx]\n",
//! );
//! let manifest: KilnManifest = serde_saphyr::from_str(yaml).expect("parse");
//! assert_eq!(manifest.directories.len(), 1);
//! ```

use camino::Utf8PathBuf;
use indexmap::IndexMap;
use semver::Version;
use serde::de::value::{MapAccessDeserializer, SeqAccessDeserializer};
use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Top-level structure parsed from a `Kilnfile`.
///
/// ```yaml
/// kiln_version: "1.0.0"
/// languages: [c, cxx]
/// definitions:
///   WRAP_JAVA: ON
/// directories:
///   - path: .
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KilnManifest {
    /// Semantic version of the project file format.
    pub kiln_version: Version,

    /// Languages enabled for the project.
    #[serde(default)]
    pub languages: Vec<String>,

    /// Definitions seeded into the configuration, in declaration order.
    #[serde(default)]
    pub definitions: IndexMap<String, String>,

    /// Directories processed by the coordinator.
    #[serde(default)]
    pub directories: Vec<Directory>,
}

/// One directory of the project tree.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Directory {
    /// Path relative to the project root; `.` is the root itself.
    pub path: Utf8PathBuf,

    /// Sources declared in this directory.
    #[serde(default)]
    pub sources: Vec<SourceDecl>,

    /// Declarative commands such as `wrap_java`.
    #[serde(default)]
    pub commands: Vec<CommandInvocation>,

    /// Custom build rules.
    #[serde(default)]
    pub rules: Vec<RuleDecl>,

    /// Real targets built from sources.
    #[serde(default)]
    pub targets: Vec<TargetDecl>,

    /// Named aggregate targets.
    #[serde(default)]
    pub utilities: Vec<UtilityDecl>,

    /// Directories that must be processed first.
    #[serde(default)]
    pub depends_on: Vec<Utf8PathBuf>,
}

/// A source declaration: a bare name or a name with properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SourceDecl {
    /// `Foo.cxx`
    Name(String),
    /// `{ name: Foo.cxx, properties: { ABSTRACT: ON } }`
    Detailed(DetailedSource),
}

/// Source declaration carrying properties.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DetailedSource {
    /// Source identifier.
    pub name: String,
    /// Properties attached to the source.
    #[serde(default)]
    pub properties: IndexMap<String, String>,
}

impl SourceDecl {
    /// Source identifier.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) => name,
            Self::Detailed(detailed) => &detailed.name,
        }
    }

    /// Declared properties in order; empty for bare names.
    pub fn properties(&self) -> impl Iterator<Item = (&str, &str)> {
        let props = match self {
            Self::Name(_) => None,
            Self::Detailed(detailed) => Some(&detailed.properties),
        };
        props
            .into_iter()
            .flatten()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A declarative command written as a single-key mapping:
/// `- wrap_java: [lib, LIST, Foo.cxx]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(
    try_from = "IndexMap<String, Vec<String>>",
    into = "IndexMap<String, Vec<String>>"
)]
pub struct CommandInvocation {
    /// Command name.
    pub name: String,
    /// Raw arguments.
    pub args: Vec<String>,
}

impl TryFrom<IndexMap<String, Vec<String>>> for CommandInvocation {
    type Error = String;

    fn try_from(map: IndexMap<String, Vec<String>>) -> Result<Self, Self::Error> {
        let mut entries = map.into_iter();
        match (entries.next(), entries.next()) {
            (Some((name, args)), None) => Ok(Self { name, args }),
            (None, _) => Err("command entry is empty".to_owned()),
            (Some(_), Some(_)) => Err("command entry must name exactly one command".to_owned()),
        }
    }
}

impl From<CommandInvocation> for IndexMap<String, Vec<String>> {
    fn from(cmd: CommandInvocation) -> Self {
        Self::from([(cmd.name, cmd.args)])
    }
}

/// A custom build rule.
///
/// Commands are either a single shell-like string split with `shlex`, or an
/// explicit token list.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RuleDecl {
    /// Output files; the first is the primary output.
    pub outputs: StringOrList,

    /// Input files.
    #[serde(default)]
    pub inputs: StringOrList,

    /// Directory the commands run in.
    #[serde(default)]
    pub working_dir: Option<Utf8PathBuf>,

    /// Command invocations, run in order.
    pub commands: Vec<CommandSpec>,

    /// Message echoed when the rule runs.
    #[serde(default)]
    pub comment: Option<String>,

    /// Run the rule on every build.
    #[serde(default)]
    pub always: bool,
}

/// One command invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CommandSpec {
    /// A command line split with shell rules.
    Line(String),
    /// Program and arguments.
    Tokens(Vec<String>),
}

// Scalars and sequences are read through typed visitors rather than
// `#[serde(untagged)]` so plain YAML words such as `ON` or `1` stay strings.
impl<'de> Deserialize<'de> for SourceDecl {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SourceVisitor;

        impl<'de> Visitor<'de> for SourceVisitor {
            type Value = SourceDecl;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a source name or a mapping with `name` and `properties`")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
                Ok(SourceDecl::Name(value.to_owned()))
            }

            fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Self::Value, A::Error> {
                DetailedSource::deserialize(MapAccessDeserializer::new(map)).map(SourceDecl::Detailed)
            }
        }

        deserializer.deserialize_any(SourceVisitor)
    }
}

impl<'de> Deserialize<'de> for CommandSpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct CommandVisitor;

        impl<'de> Visitor<'de> for CommandVisitor {
            type Value = CommandSpec;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a command line or a list of tokens")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
                Ok(CommandSpec::Line(value.to_owned()))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, seq: A) -> Result<Self::Value, A::Error> {
                Vec::<String>::deserialize(SeqAccessDeserializer::new(seq)).map(CommandSpec::Tokens)
            }
        }

        deserializer.deserialize_any(CommandVisitor)
    }
}

/// A real target.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TargetDecl {
    /// Target name.
    pub name: String,
    /// Source identifiers; `${NAME}` splices a list.
    #[serde(default)]
    pub sources: StringOrList,
}

const fn default_true() -> bool {
    true
}

/// A named aggregate target.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UtilityDecl {
    /// Target name.
    pub name: String,
    /// Files or targets it depends on.
    #[serde(default)]
    pub depends: StringOrList,
    /// Whether the target is always out of date.
    #[serde(default = "default_true")]
    pub always: bool,
}

/// A helper for fields that accept either a single string or a list of
/// strings.
///
/// It mirrors YAML syntax where a scalar or sequence is allowed. Empty values
/// deserialize to `StringOrList::Empty`.
///
/// ```yaml
/// # Scalar
/// outputs: out.txt
/// # Sequence
/// outputs:
///   - out.txt
///   - out.log
/// ```
#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum StringOrList {
    /// No value provided.
    #[default]
    Empty,
    /// A single string item.
    String(String),
    /// A list of string items.
    List(Vec<String>),
}

impl StringOrList {
    /// Items as an owned vector.
    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Self::Empty => Vec::new(),
            Self::String(item) => vec![item.clone()],
            Self::List(items) => items.clone(),
        }
    }
}
