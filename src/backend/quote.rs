//! Quoting helpers for text placed in generated build files.
//!
//! Commands are quoted for the shell named by the profile. Everything that
//! lands in a recipe is then escaped for make itself, which treats `$` as the
//! start of a variable reference.
//
// Module-level suppression for version-dependent lint false positives from
// miette/thiserror derive macros.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use camino::Utf8Path;
use miette::Diagnostic;
use shell_quote::{QuoteRefExt, Sh};
use thiserror::Error;

use super::profile::{BackendProfile, ShellStyle};

/// Text that cannot be represented on a single command line.
#[derive(Debug, Error, Diagnostic, PartialEq, Eq)]
pub enum QuoteError {
    /// Carriage returns and line feeds would split the recipe line.
    #[error("`{token}` contains a line break and cannot be quoted")]
    #[diagnostic(
        code(kiln::quote::line_break),
        help("split the command into separate invocations instead")
    )]
    ContainsLineBreak {
        /// The offending token.
        token: String,
    },
}

const fn is_shell_safe(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.' | '/' | ':' | '=' | '+' | ',' | '@')
}

const fn is_windows_safe(ch: char) -> bool {
    is_shell_safe(ch) || ch == '\\'
}

/// Quote `token` for `shell`, leaving plain words untouched.
///
/// # Errors
///
/// Returns [`QuoteError::ContainsLineBreak`] when the token spans lines.
pub fn quote_token(shell: ShellStyle, token: &str) -> Result<String, QuoteError> {
    if token.chars().any(|ch| matches!(ch, '\n' | '\r')) {
        return Err(QuoteError::ContainsLineBreak {
            token: token.to_owned(),
        });
    }
    match shell {
        ShellStyle::Posix => Ok(quote_posix(token)),
        ShellStyle::Windows => Ok(quote_windows(token)),
    }
}

fn quote_posix(token: &str) -> String {
    if !token.is_empty() && token.chars().all(is_shell_safe) {
        return token.to_owned();
    }
    let bytes: Vec<u8> = token.quoted(Sh);
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => {
            debug_assert!(false, "shell quoting produced non UTF-8 bytes: {err}");
            String::from_utf8_lossy(&err.into_bytes()).into_owned()
        }
    }
}

fn quote_windows(token: &str) -> String {
    if token.is_empty() {
        return "\"\"".to_owned();
    }
    if token.chars().all(is_windows_safe) {
        return token.to_owned();
    }
    let mut buf = String::with_capacity(token.len() + 2);
    buf.push('"');
    for ch in token.chars() {
        match ch {
            '"' | '^' | '&' | '|' | '<' | '>' | '!' => {
                buf.push('^');
                buf.push(ch);
            }
            '%' => buf.push_str("%%"),
            _ => buf.push(ch),
        }
    }
    buf.push('"');
    buf
}

/// Escape text for a make recipe or variable value.
#[must_use]
pub fn escape_make(text: &str) -> String {
    text.replace('$', "$$")
}

/// Render `path` for a command line, converting separators when the
/// profile does not force Unix paths.
///
/// # Errors
///
/// Returns [`QuoteError`] when the path cannot be quoted.
pub fn shell_path(profile: &BackendProfile, path: &Utf8Path) -> Result<String, QuoteError> {
    let text = native_path(profile, path.as_str());
    quote_token(profile.shell(), &text)
}

/// Convert separators in `path` for the profile's shell.
#[must_use]
pub fn native_path(profile: &BackendProfile, path: &str) -> String {
    if profile.force_unix_paths() {
        path.to_owned()
    } else {
        path.replace('/', "\\")
    }
}

/// Render `path` as a make dependency or target name.
#[must_use]
pub fn make_path(profile: &BackendProfile, path: &Utf8Path) -> String {
    let text = escape_make(path.as_str());
    if !text.contains(' ') {
        return text;
    }
    match profile.shell() {
        ShellStyle::Posix => text.replace(' ', "\\ "),
        ShellStyle::Windows => format!("\"{text}\""),
    }
}

/// Render the argument of an include directive.
#[must_use]
pub fn include_path(profile: &BackendProfile, path: &Utf8Path) -> String {
    if profile.quote_include_paths() {
        format!("\"{}\"", native_path(profile, path.as_str()))
    } else {
        make_path(profile, path)
    }
}

/// Render text handed to `echo`.
///
/// # Errors
///
/// Returns [`QuoteError`] when the text cannot be quoted.
pub fn echo_text(profile: &BackendProfile, text: &str) -> Result<String, QuoteError> {
    if profile.echo_needs_quote() {
        quote_token(profile.shell(), text)
    } else if text.chars().any(|ch| matches!(ch, '\n' | '\r')) {
        Err(QuoteError::ContainsLineBreak {
            token: text.to_owned(),
        })
    } else {
        Ok(text.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::profile::builtin;
    use rstest::rstest;

    #[rstest]
    #[case("simple", "simple")]
    #[case("", "\"\"")]
    #[case("needs space", "\"needs space\"")]
    #[case("pipe|test", "\"pipe^|test\"")]
    #[case("caret^test", "\"caret^^test\"")]
    #[case("report&del *.txt", "\"report^&del *.txt\"")]
    #[case("%TEMP%", "\"%%TEMP%%\"")]
    #[case("echo!boom", "\"echo^!boom\"")]
    #[case("say \"hi\"", "\"say ^\"hi^\"\"")]
    #[case(r"C:\tools\wrap.exe", r"C:\tools\wrap.exe")]
    fn windows_quoting_escapes_metacharacters(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(
            quote_token(ShellStyle::Windows, input).expect("quote"),
            expected
        );
    }

    #[rstest]
    #[case("plain/path.cxx")]
    #[case("-DFOO=1")]
    fn posix_quoting_leaves_plain_words(#[case] input: &str) {
        assert_eq!(quote_token(ShellStyle::Posix, input).expect("quote"), input);
    }

    #[rstest]
    fn posix_quoting_wraps_spaces() {
        let quoted = quote_token(ShellStyle::Posix, "needs space").expect("quote");
        assert_ne!(quoted, "needs space");
        assert!(quoted.contains('\'') || quoted.contains('"'));
    }

    #[rstest]
    #[case(ShellStyle::Posix)]
    #[case(ShellStyle::Windows)]
    fn line_breaks_are_rejected(#[case] shell: ShellStyle) {
        assert_eq!(
            quote_token(shell, "line\nbreak"),
            Err(QuoteError::ContainsLineBreak {
                token: "line\nbreak".into()
            })
        );
    }

    #[rstest]
    fn make_escape_doubles_dollars() {
        assert_eq!(escape_make("echo $HOME $$"), "echo $$HOME $$$$");
    }

    #[rstest]
    fn watcom_paths_use_backslashes_and_quoted_includes() {
        let profile = builtin("watcom").expect("profile");
        assert_eq!(
            shell_path(&profile, Utf8Path::new("src/Foo.h")).expect("quote"),
            r"src\Foo.h"
        );
        assert_eq!(
            include_path(&profile, Utf8Path::new("src/build.make")),
            "\"src\\build.make\""
        );
    }

    #[rstest]
    fn unix_make_paths_escape_spaces() {
        let profile = builtin("unix").expect("profile");
        assert_eq!(
            make_path(&profile, Utf8Path::new("my dir/out.o")),
            "my\\ dir/out.o"
        );
        assert_eq!(
            include_path(&profile, Utf8Path::new("src/build.make")),
            "src/build.make"
        );
    }
}
