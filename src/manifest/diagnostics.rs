//! Translates project file parsing errors into actionable diagnostics.
//!
//! Parser failures from `serde_saphyr` are wrapped in a [`miette`] diagnostic
//! that carries the YAML source, a span at the reported location and a hint
//! for common mistakes such as tab indentation.
//
// Module-level suppression for version-dependent lint false positives from
// miette/thiserror derive macros.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use miette::{Diagnostic, NamedSource, SourceSpan};
use semver::Version;
use serde_saphyr::{Error as YamlError, Location};
use thiserror::Error;

const YAML_HINTS: [(&str, &str); 4] = [
    (
        "did not find expected '-'",
        "Start list items with '-' and ensure proper indentation.",
    ),
    (
        "mapping values are not allowed",
        "Check for a stray ':' or add quotes around values where needed.",
    ),
    (
        "unknown field",
        "Check the key name against the Kilnfile schema.",
    ),
    (
        "found character that cannot start any token",
        "Remove stray characters and ensure indentation uses spaces (no tabs).",
    ),
];

/// Errors raised while loading a `Kilnfile`.
#[derive(Debug, Error, Diagnostic)]
pub enum ManifestError {
    /// The YAML could not be parsed into the schema.
    #[error("project file parse error")]
    #[diagnostic(code(kiln::manifest::parse))]
    Parse {
        /// Detailed diagnostic with source span.
        #[source]
        #[diagnostic_source]
        source: Box<dyn Diagnostic + Send + Sync + 'static>,
    },

    /// The project file targets an incompatible format version.
    #[error("kiln_version {found} is not supported (expected {supported}.x)")]
    #[diagnostic(
        code(kiln::manifest::version),
        help("update the project file or use a matching kiln release")
    )]
    UnsupportedVersion {
        /// Version declared in the file.
        found: Version,
        /// Supported major version.
        supported: u64,
    },
}

#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(kiln::yaml::parse))]
struct YamlDiagnostic {
    #[source_code]
    src: NamedSource<String>,
    #[label("parse error here")]
    span: Option<SourceSpan>,
    #[help]
    help: Option<String>,
    #[source]
    source: YamlError,
    message: String,
}

/// Byte offset of a 1-based line/column location, clamped to the source.
fn byte_index(src: &str, line: u64, column: u64) -> usize {
    let target_line = usize::try_from(line.saturating_sub(1)).unwrap_or(usize::MAX);
    let target_column = usize::try_from(column.saturating_sub(1)).unwrap_or(usize::MAX);
    let mut offset = 0usize;
    for (idx, segment) in src.split_inclusive('\n').enumerate() {
        if idx == target_line {
            let without_newline = segment.strip_suffix('\n').unwrap_or(segment);
            let cleaned = without_newline
                .strip_suffix('\r')
                .unwrap_or(without_newline);
            let column_offset = cleaned
                .char_indices()
                .nth(target_column)
                .map_or(cleaned.len(), |(byte_idx, _)| byte_idx);
            return offset + column_offset;
        }
        offset += segment.len();
    }
    src.len()
}

fn to_span(src: &str, loc: Location) -> SourceSpan {
    let at = byte_index(src, loc.line(), loc.column());
    let len = usize::from(src.as_bytes().get(at).is_some_and(|b| !matches!(b, b'\n' | b'\r')));
    SourceSpan::new(at.into(), len)
}

fn has_tab_indent(src: &str, location: Option<Location>) -> bool {
    let Some(loc) = location else {
        return false;
    };
    let line_idx = usize::try_from(loc.line().saturating_sub(1)).unwrap_or(usize::MAX);
    src.lines()
        .nth(line_idx)
        .unwrap_or_default()
        .chars()
        .take_while(|c| c.is_whitespace())
        .any(|c| c == '\t')
}

fn hint_for(err_str: &str, src: &str, loc: Option<Location>) -> Option<String> {
    if has_tab_indent(src, loc) {
        return Some("Use spaces for indentation; tabs are invalid in YAML.".into());
    }
    let lower = err_str.to_lowercase();
    YAML_HINTS
        .iter()
        .find(|(needle, _)| lower.contains(*needle))
        .map(|(_, hint)| (*hint).into())
}

/// Map a `serde_saphyr` error into a [`miette`] diagnostic naming `name`.
#[must_use]
pub fn map_yaml_error(
    err: YamlError,
    src: &str,
    name: &str,
) -> Box<dyn Diagnostic + Send + Sync + 'static> {
    let loc = err.location();
    let (line, col, span) = loc.map_or((1, 1, None), |l| {
        (l.line(), l.column(), Some(to_span(src, l)))
    });
    let err_str = err.to_string();
    let help = hint_for(&err_str, src, loc);
    Box::new(YamlDiagnostic {
        src: NamedSource::new(name, src.to_owned()),
        span,
        help,
        source: err,
        message: format!("YAML parse error at line {line}, column {col}: {err_str}"),
    })
}
