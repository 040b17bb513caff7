//! Backend profiles: the syntactic quirks of one make dialect.
//!
//! A [`BackendProfile`] is an immutable, validated bundle of toggles. The
//! renderer consults it for every decision that differs between dialects, so
//! supporting a new dialect means writing a new profile rather than a new
//! renderer. Profiles are built from a [`ProfileSpec`], either one of the
//! built-in catalogue entries or a YAML file supplied by the user.
//!
//! ```
//! use kiln::backend::profile::{BackendProfile, ProfileSpec};
//!
//! let spec = ProfileSpec {
//!     line_continuation: String::new(),
//!     ..ProfileSpec::default()
//! };
//! assert!(BackendProfile::new(spec).is_err());
//! ```
//
// Module-level suppression for version-dependent lint false positives from
// miette/thiserror derive macros.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use indexmap::IndexMap;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shortest object name a mangling profile may demand.
const MIN_OBJECT_NAME_LIMIT: usize = 16;

/// Errors raised while validating a profile.
#[derive(Debug, Error, Diagnostic, PartialEq, Eq)]
pub enum ProfileError {
    /// A required string toggle is empty.
    #[error("profile field `{field}` must not be empty")]
    #[diagnostic(code(kiln::profile::empty_field))]
    EmptyField {
        /// Name of the empty field.
        field: &'static str,
    },

    /// Mangling is enabled with a limit too small to hold a digest.
    #[error("object name limit {limit} is below the minimum of {MIN_OBJECT_NAME_LIMIT}")]
    #[diagnostic(code(kiln::profile::object_name_limit))]
    ObjectNameLimit {
        /// The configured limit.
        limit: usize,
    },

    /// No built-in profile has the requested name.
    #[error("unknown backend `{name}`; available backends: {available}")]
    #[diagnostic(code(kiln::profile::unknown_backend))]
    UnknownBackend {
        /// Requested name.
        name: String,
        /// Comma-separated list of built-in names.
        available: String,
    },

    /// A profile file could not be parsed.
    #[error("invalid profile description: {message}")]
    #[diagnostic(code(kiln::profile::parse))]
    Parse {
        /// Parser message.
        message: String,
    },
}

/// How command lines are quoted for the shell make hands them to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShellStyle {
    /// POSIX `sh`.
    Posix,
    /// The Windows command interpreter.
    Windows,
}

/// How a target without a real file is marked.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", content = "token", rename_all = "snake_case")]
pub enum SymbolicStyle {
    /// A separate declaration line, e.g. `.PHONY: name`.
    Declaration(String),
    /// A marker in the dependency list, e.g. `name : .SYMBOLIC deps`.
    Attribute(String),
}

impl SymbolicStyle {
    /// The dialect token.
    #[must_use]
    pub fn token(&self) -> &str {
        match self {
            Self::Declaration(token) | Self::Attribute(token) => token,
        }
    }
}

/// Raw, unvalidated profile description.
///
/// Every field has a default matching POSIX make, so a profile file only
/// lists what differs.
#[expect(
    clippy::struct_excessive_bools,
    reason = "each flag is an independent dialect toggle"
)]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProfileSpec {
    /// Short selector used on the command line (`-G`).
    pub key: String,
    /// Display name of the dialect.
    pub name: String,
    /// One-line description for help output.
    pub brief: String,
    /// Name of the make program that reads the output.
    pub make_program: String,
    /// Top-level build file name.
    pub build_file: String,
    /// Per-directory fragment file name.
    pub fragment_file: String,
    /// Quote paths in include directives.
    pub quote_include_paths: bool,
    /// Flatten and shorten object file names.
    pub mangle_object_names: bool,
    /// Longest object file name when mangling.
    pub object_name_limit: usize,
    /// Object file extension including the dot.
    pub object_extension: String,
    /// Use backslashes in object paths.
    pub windows_object_path: bool,
    /// Keep forward slashes in paths handed to commands.
    pub force_unix_paths: bool,
    /// Token ending a continued line.
    pub line_continuation: String,
    /// Marker for targets without a file.
    pub symbolic: SymbolicStyle,
    /// Never quote object file names.
    pub no_quoted_objects: bool,
    /// Shell used to run commands.
    pub shell: ShellStyle,
    /// Let make echo each command line.
    pub echo_commands: bool,
    /// Quote text passed to `echo`.
    pub echo_needs_quote: bool,
    /// Emit an empty `NULL` variable for Windows makes.
    pub define_windows_null: bool,
    /// Flags that silence the make program.
    pub silent_flag: String,
    /// Directive that includes another file.
    pub include_directive: String,
    /// Change directories with `cd dir && cmd` instead of a separate line.
    pub unix_cd: bool,
    /// Compiler per language, written as defaults when languages are enabled.
    pub compilers: IndexMap<String, String>,
    /// Extra definitions written when languages are enabled.
    pub definitions: IndexMap<String, String>,
}

impl Default for ProfileSpec {
    fn default() -> Self {
        Self {
            key: "unix".into(),
            name: "Unix Makefiles".into(),
            brief: "Generates standard UNIX makefiles.".into(),
            make_program: "make".into(),
            build_file: "Makefile".into(),
            fragment_file: "build.make".into(),
            quote_include_paths: false,
            mangle_object_names: false,
            object_name_limit: 128,
            object_extension: ".o".into(),
            windows_object_path: false,
            force_unix_paths: true,
            line_continuation: "\\".into(),
            symbolic: SymbolicStyle::Declaration(".PHONY".into()),
            no_quoted_objects: false,
            shell: ShellStyle::Posix,
            echo_commands: true,
            echo_needs_quote: true,
            define_windows_null: false,
            silent_flag: "-s".into(),
            include_directive: "include".into(),
            unix_cd: true,
            compilers: IndexMap::from([
                ("c".to_owned(), "cc".to_owned()),
                ("cxx".to_owned(), "c++".to_owned()),
            ]),
            definitions: IndexMap::new(),
        }
    }
}

/// A validated, immutable backend profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendProfile {
    spec: ProfileSpec,
}

impl BackendProfile {
    /// Validate `spec` and freeze it.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::EmptyField`] for an empty name, file name,
    /// continuation token, include directive, symbolic token or object
    /// extension, and [`ProfileError::ObjectNameLimit`] when mangling is
    /// enabled with a limit too small to hold a digest.
    pub fn new(spec: ProfileSpec) -> Result<Self, ProfileError> {
        let required = [
            ("key", spec.key.as_str()),
            ("name", spec.name.as_str()),
            ("build_file", spec.build_file.as_str()),
            ("fragment_file", spec.fragment_file.as_str()),
            ("line_continuation", spec.line_continuation.as_str()),
            ("include_directive", spec.include_directive.as_str()),
            ("symbolic", spec.symbolic.token()),
            ("object_extension", spec.object_extension.as_str()),
        ];
        if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(ProfileError::EmptyField { field });
        }
        if spec.mangle_object_names && spec.object_name_limit < MIN_OBJECT_NAME_LIMIT {
            return Err(ProfileError::ObjectNameLimit {
                limit: spec.object_name_limit,
            });
        }
        Ok(Self { spec })
    }

    /// Parse and validate a YAML profile description.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::Parse`] for malformed YAML and any validation
    /// error from [`BackendProfile::new`].
    pub fn from_yaml(yaml: &str) -> Result<Self, ProfileError> {
        let spec: ProfileSpec = serde_saphyr::from_str(yaml).map_err(|e| ProfileError::Parse {
            message: e.to_string(),
        })?;
        Self::new(spec)
    }

    /// The description this profile was built from.
    #[must_use]
    pub const fn spec(&self) -> &ProfileSpec {
        &self.spec
    }

    /// Short selector.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.spec.key
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// One-line description.
    #[must_use]
    pub fn brief(&self) -> &str {
        &self.spec.brief
    }

    /// Make program name.
    #[must_use]
    pub fn make_program(&self) -> &str {
        &self.spec.make_program
    }

    /// Top-level build file name.
    #[must_use]
    pub fn build_file(&self) -> &str {
        &self.spec.build_file
    }

    /// Per-directory fragment name.
    #[must_use]
    pub fn fragment_file(&self) -> &str {
        &self.spec.fragment_file
    }

    /// Whether include paths are quoted.
    #[must_use]
    pub const fn quote_include_paths(&self) -> bool {
        self.spec.quote_include_paths
    }

    /// Whether object names are flattened and shortened.
    #[must_use]
    pub const fn mangle_object_names(&self) -> bool {
        self.spec.mangle_object_names
    }

    /// Longest object name when mangling.
    #[must_use]
    pub const fn object_name_limit(&self) -> usize {
        self.spec.object_name_limit
    }

    /// Object file extension.
    #[must_use]
    pub fn object_extension(&self) -> &str {
        &self.spec.object_extension
    }

    /// Whether object paths use backslashes.
    #[must_use]
    pub const fn windows_object_path(&self) -> bool {
        self.spec.windows_object_path
    }

    /// Whether command paths keep forward slashes.
    #[must_use]
    pub const fn force_unix_paths(&self) -> bool {
        self.spec.force_unix_paths
    }

    /// Line continuation token.
    #[must_use]
    pub fn line_continuation(&self) -> &str {
        &self.spec.line_continuation
    }

    /// Symbolic target style.
    #[must_use]
    pub const fn symbolic(&self) -> &SymbolicStyle {
        &self.spec.symbolic
    }

    /// Whether object names are never quoted.
    #[must_use]
    pub const fn no_quoted_objects(&self) -> bool {
        self.spec.no_quoted_objects
    }

    /// Shell quoting style.
    #[must_use]
    pub const fn shell(&self) -> ShellStyle {
        self.spec.shell
    }

    /// Whether make echoes command lines.
    #[must_use]
    pub const fn echo_commands(&self) -> bool {
        self.spec.echo_commands
    }

    /// Whether echoed text is quoted.
    #[must_use]
    pub const fn echo_needs_quote(&self) -> bool {
        self.spec.echo_needs_quote
    }

    /// Whether a `NULL` variable is emitted.
    #[must_use]
    pub const fn define_windows_null(&self) -> bool {
        self.spec.define_windows_null
    }

    /// Silent flags for the make program.
    #[must_use]
    pub fn silent_flag(&self) -> &str {
        &self.spec.silent_flag
    }

    /// Include directive.
    #[must_use]
    pub fn include_directive(&self) -> &str {
        &self.spec.include_directive
    }

    /// Whether `cd` is chained onto the command.
    #[must_use]
    pub const fn unix_cd(&self) -> bool {
        self.spec.unix_cd
    }

    /// Default compiler for `language`.
    #[must_use]
    pub fn compiler(&self, language: &str) -> Option<&str> {
        self.spec.compilers.get(language).map(String::as_str)
    }

    /// Extra definitions written on language enablement.
    pub fn definitions(&self) -> impl Iterator<Item = (&str, &str)> {
        self.spec
            .definitions
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl TryFrom<ProfileSpec> for BackendProfile {
    type Error = ProfileError;

    fn try_from(spec: ProfileSpec) -> Result<Self, Self::Error> {
        Self::new(spec)
    }
}

fn watcom_spec() -> ProfileSpec {
    ProfileSpec {
        key: "watcom".into(),
        name: "Watcom WMake".into(),
        brief: "Generates Watcom WMake makefiles.".into(),
        make_program: "wmake".into(),
        quote_include_paths: true,
        mangle_object_names: true,
        object_name_limit: 32,
        object_extension: ".obj".into(),
        windows_object_path: true,
        force_unix_paths: false,
        line_continuation: "&".into(),
        symbolic: SymbolicStyle::Attribute(".SYMBOLIC".into()),
        no_quoted_objects: true,
        shell: ShellStyle::Windows,
        echo_needs_quote: false,
        define_windows_null: true,
        silent_flag: "-s -h".into(),
        include_directive: "!include".into(),
        unix_cd: false,
        compilers: IndexMap::from([
            ("c".to_owned(), "wcl386".to_owned()),
            ("cxx".to_owned(), "wcl386".to_owned()),
        ]),
        definitions: IndexMap::from([("WATCOM".to_owned(), "1".to_owned())]),
        ..ProfileSpec::default()
    }
}

fn nmake_spec() -> ProfileSpec {
    ProfileSpec {
        key: "nmake".into(),
        name: "NMake Makefiles".into(),
        brief: "Generates NMake makefiles.".into(),
        make_program: "nmake".into(),
        quote_include_paths: true,
        object_extension: ".obj".into(),
        windows_object_path: true,
        force_unix_paths: false,
        shell: ShellStyle::Windows,
        echo_needs_quote: false,
        silent_flag: "/NOLOGO".into(),
        include_directive: "!include".into(),
        unix_cd: false,
        compilers: IndexMap::from([
            ("c".to_owned(), "cl".to_owned()),
            ("cxx".to_owned(), "cl".to_owned()),
        ]),
        ..ProfileSpec::default()
    }
}

fn mingw_spec() -> ProfileSpec {
    ProfileSpec {
        key: "mingw".into(),
        name: "MinGW Makefiles".into(),
        brief: "Generates a make file for use with mingw32-make.".into(),
        make_program: "mingw32-make".into(),
        object_extension: ".obj".into(),
        force_unix_paths: false,
        shell: ShellStyle::Windows,
        echo_needs_quote: false,
        define_windows_null: true,
        unix_cd: false,
        compilers: IndexMap::from([
            ("c".to_owned(), "gcc".to_owned()),
            ("cxx".to_owned(), "g++".to_owned()),
        ]),
        definitions: IndexMap::from([("MINGW".to_owned(), "1".to_owned())]),
        ..ProfileSpec::default()
    }
}

/// Built-in profile descriptions, in the order they are listed to users.
#[must_use]
pub fn builtin_specs() -> Vec<ProfileSpec> {
    vec![ProfileSpec::default(), watcom_spec(), nmake_spec(), mingw_spec()]
}

/// Look up a built-in profile by key or display name.
///
/// # Errors
///
/// Returns [`ProfileError::UnknownBackend`] when no profile matches.
pub fn builtin(name: &str) -> Result<BackendProfile, ProfileError> {
    let specs = builtin_specs();
    let available = specs.iter().map(|s| s.key.as_str()).collect::<Vec<_>>().join(", ");
    let spec = specs
        .iter()
        .find(|s| s.key == name || s.name.eq_ignore_ascii_case(name))
        .cloned()
        .ok_or_else(|| ProfileError::UnknownBackend {
            name: name.to_owned(),
            available,
        })?;
    BackendProfile::new(spec)
}
