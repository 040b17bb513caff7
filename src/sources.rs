//! Source registry used by declarative commands.
//!
//! Each directory declares its sources in the `Kilnfile`; expanders consult
//! the registry to read per-source properties such as `WRAP_EXCLUDE` and
//! register the files they generate so later stages treat them as ordinary
//! sources.

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;

use crate::config::is_on;

/// Value stored for a property set without a value.
pub const NOT_FOUND: &str = "NOTFOUND";

/// Flat string property bag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyMap(IndexMap<String, String>);

impl PropertyMap {
    /// Create an empty property map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name`. A missing value is stored as [`NOT_FOUND`].
    pub fn set(&mut self, name: impl Into<String>, value: Option<&str>) {
        self.0
            .insert(name.into(), value.unwrap_or(NOT_FOUND).to_owned());
    }

    /// Raw property value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Interpret a property as a flag; unset properties are off.
    #[must_use]
    pub fn get_as_bool(&self, name: &str) -> bool {
        self.get(name).is_some_and(is_on)
    }

    /// Iterate over properties in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A source file known to the project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// File name without extension.
    pub name: String,
    /// Directory holding the file.
    pub directory: Utf8PathBuf,
    /// Extension without the leading dot; empty when the file has none.
    pub extension: String,
    /// Properties attached in the project description or by expanders.
    pub properties: PropertyMap,
    /// Whether a rule produces this file.
    pub generated: bool,
    /// Files this source is derived from.
    pub depends: Vec<Utf8PathBuf>,
}

impl SourceFile {
    /// Create a source from its name/directory/extension triple.
    pub fn new(
        name: impl Into<String>,
        directory: impl Into<Utf8PathBuf>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            directory: directory.into(),
            extension: extension.into(),
            properties: PropertyMap::new(),
            generated: false,
            depends: Vec::new(),
        }
    }

    /// Create a source from an identifier such as `sub/Foo.cxx` declared in
    /// `directory`.
    #[must_use]
    pub fn from_identifier(identifier: &str, directory: &Utf8Path) -> Self {
        let path = Utf8Path::new(identifier);
        let parent = path
            .parent()
            .filter(|p| !p.as_str().is_empty())
            .map_or_else(|| directory.to_path_buf(), |p| directory.join(p));
        let name = path.file_stem().unwrap_or(identifier);
        let extension = path.extension().unwrap_or_default();
        Self::new(name, parent, extension)
    }

    /// File name including the extension.
    #[must_use]
    pub fn file_name(&self) -> String {
        if self.extension.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.name, self.extension)
        }
    }

    /// Location of the file.
    #[must_use]
    pub fn full_path(&self) -> Utf8PathBuf {
        self.directory.join(self.file_name())
    }

    /// Interpret a property as a flag.
    #[must_use]
    pub fn get_property_as_bool(&self, name: &str) -> bool {
        self.properties.get_as_bool(name)
    }

    fn matches(&self, identifier: &str) -> bool {
        let path = Utf8Path::new(identifier);
        let file_name = path.file_name().unwrap_or(identifier);
        self.file_name() == file_name
            || (path.extension().is_none() && self.name == file_name)
    }
}

#[derive(Debug, Clone)]
struct Entry {
    scope: Option<Utf8PathBuf>,
    file: SourceFile,
}

/// All sources known to one configuration pass, in registration order.
///
/// Each source belongs to the directory that was current when it was added.
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    files: IndexMap<Utf8PathBuf, Entry>,
    current: Option<Utf8PathBuf>,
}

impl SourceRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the directory that later [`add`](Self::add) calls belong to
    /// and [`lookup`](Self::lookup) searches.
    pub fn enter_directory(&mut self, path: impl Into<Utf8PathBuf>) {
        self.current = Some(path.into());
    }

    /// Register `file` in the current directory, replacing an entry at the
    /// same path.
    pub fn add(&mut self, file: SourceFile) {
        let entry = Entry {
            scope: self.current.clone(),
            file,
        };
        self.files.insert(entry.file.full_path(), entry);
    }

    /// Find a source by identifier (`Foo.cxx` or bare `Foo`), searching
    /// every directory in registration order.
    #[must_use]
    pub fn get(&self, identifier: &str) -> Option<&SourceFile> {
        self.iter().find(|file| file.matches(identifier))
    }

    /// Find a source by identifier among those of the current directory.
    ///
    /// Sources declared or generated by other directories never match.
    #[must_use]
    pub fn lookup(&self, identifier: &str) -> Option<&SourceFile> {
        self.files
            .values()
            .find(|entry| entry.scope == self.current && entry.file.matches(identifier))
            .map(|entry| &entry.file)
    }

    /// Whether a source lives at `path`.
    #[must_use]
    pub fn contains_path(&self, path: &Utf8Path) -> bool {
        self.files.contains_key(path)
    }

    /// Number of registered sources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether no sources are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Iterate over sources in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &SourceFile> {
        self.files.values().map(|entry| &entry.file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn property_without_value_reads_notfound() {
        let mut props = PropertyMap::new();
        props.set("ABSTRACT", None);
        assert_eq!(props.get("ABSTRACT"), Some(NOT_FOUND));
        assert!(!props.get_as_bool("ABSTRACT"));
    }

    #[rstest]
    #[case("Foo.cxx", "src", "Foo", "src", "cxx")]
    #[case("sub/Bar.h", "src", "Bar", "src/sub", "h")]
    #[case("Baz", "src", "Baz", "src", "")]
    fn from_identifier_splits_triple(
        #[case] identifier: &str,
        #[case] dir: &str,
        #[case] name: &str,
        #[case] directory: &str,
        #[case] extension: &str,
    ) {
        let file = SourceFile::from_identifier(identifier, Utf8Path::new(dir));
        assert_eq!(file.name, name);
        assert_eq!(file.directory, directory);
        assert_eq!(file.extension, extension);
    }

    #[rstest]
    fn lookup_only_searches_current_directory() {
        let mut registry = SourceRegistry::new();
        registry.enter_directory("a");
        let mut excluded = SourceFile::new("Bar", "/src/a", "cxx");
        excluded.properties.set("WRAP_EXCLUDE", Some("1"));
        registry.add(excluded);
        registry.enter_directory("b");
        registry.add(SourceFile::new("Foo", "/src/b", "cxx"));
        registry.add(SourceFile::new("FooJava", "b", "cxx"));

        assert_eq!(
            registry.lookup("Foo").map(|f| f.directory.as_str()),
            Some("/src/b")
        );
        assert!(registry.lookup("FooJava.cxx").is_some());
        assert!(registry.lookup("Bar").is_none());
        assert!(registry.get("Bar").is_some());

        registry.enter_directory("c");
        assert!(registry.lookup("Foo.cxx").is_none());
        registry.enter_directory("a");
        assert!(registry.lookup("Bar.cxx").is_some());
    }

    #[rstest]
    fn get_by_full_name_does_not_match_other_extension() {
        let mut registry = SourceRegistry::new();
        registry.add(SourceFile::new("Foo", "a", "h"));
        assert!(registry.get("Foo.cxx").is_none());
        assert!(registry.get("Foo").is_some());
    }
}
