//! Object file naming.
//!
//! Each target keeps its objects under `<target>.dir/`. Dialects with short
//! file name limits flatten the source path and replace the tail of an
//! over-long name with a digest so distinct sources never collide.

use camino::Utf8Path;

use super::profile::BackendProfile;
use crate::hasher::ContentHasher;

const DIGEST_LEN: usize = 8;

/// Object file path for `source` built as part of `target`.
#[must_use]
pub fn object_name(profile: &BackendProfile, target: &str, source: &Utf8Path) -> String {
    let without_ext = source.with_extension("");
    let stem = without_ext.as_str().trim_start_matches("./");
    let ext = profile.object_extension();
    let file = if profile.mangle_object_names() {
        shorten(&stem.replace(['/', '\\', ':'], "_"), ext, profile.object_name_limit())
    } else {
        format!("{stem}{ext}")
    };
    let name = format!("{target}.dir/{file}");
    if profile.windows_object_path() {
        name.replace('/', "\\")
    } else {
        name
    }
}

fn shorten(stem: &str, ext: &str, limit: usize) -> String {
    let full = format!("{stem}{ext}");
    if full.len() <= limit {
        return full;
    }
    let keep = limit.saturating_sub(ext.len() + DIGEST_LEN + 1);
    // Longest prefix within `keep` bytes that ends on a char boundary.
    let cut = stem
        .char_indices()
        .map(|(start, ch)| start + ch.len_utf8())
        .take_while(|end| *end <= keep)
        .last()
        .unwrap_or(0);
    let prefix = stem.get(..cut).unwrap_or_default();
    let digest = ContentHasher::short(stem, DIGEST_LEN);
    format!("{prefix}_{digest}{ext}")
}

/// Render an object name for a make variable.
#[must_use]
pub fn render_object(profile: &BackendProfile, name: &str) -> String {
    if !profile.no_quoted_objects() && name.contains(' ') {
        format!("\"{name}\"")
    } else {
        name.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::profile::builtin;
    use rstest::rstest;

    #[rstest]
    fn unix_objects_keep_source_layout() {
        let profile = builtin("unix").expect("profile");
        assert_eq!(
            object_name(&profile, "app", Utf8Path::new("src/main.c")),
            "app.dir/src/main.o"
        );
    }

    #[rstest]
    fn watcom_objects_are_flattened() {
        let profile = builtin("watcom").expect("profile");
        assert_eq!(
            object_name(&profile, "app", Utf8Path::new("src/main.c")),
            r"app.dir\src_main.obj"
        );
    }

    #[rstest]
    fn long_names_are_shortened_with_digest() {
        let profile = builtin("watcom").expect("profile");
        let name = object_name(
            &profile,
            "vtk",
            Utf8Path::new("VeryLongGeneratedSourceNameJava.cxx"),
        );
        let file = name.trim_start_matches("vtk.dir\\");
        assert_eq!(file.len(), 32);
        assert_eq!(file, "VeryLongGeneratedSo_113cd734.obj");
    }

    #[rstest]
    fn non_ascii_names_respect_the_byte_limit() {
        let profile = builtin("watcom").expect("profile");
        let name = object_name(
            &profile,
            "vtk",
            Utf8Path::new("ÄußerstLangerQuelltextNameÜberGrenze.cxx"),
        );
        let file = name.trim_start_matches("vtk.dir\\");
        assert!(file.len() <= profile.object_name_limit(), "{file}");
        assert!(file.ends_with(".obj"));
        assert!(file.starts_with("ÄußerstLange"), "{file}");
    }

    #[rstest]
    fn distinct_long_names_do_not_collide() {
        let profile = builtin("watcom").expect("profile");
        let a = object_name(&profile, "t", Utf8Path::new("AVeryLongSourceFileNameNumberOne.cxx"));
        let b = object_name(&profile, "t", Utf8Path::new("AVeryLongSourceFileNameNumberTwo.cxx"));
        assert_ne!(a, b);
    }

    #[rstest]
    fn spaces_are_quoted_unless_disabled() {
        let unix = builtin("unix").expect("profile");
        let watcom = builtin("watcom").expect("profile");
        assert_eq!(render_object(&unix, "a b.o"), "\"a b.o\"");
        assert_eq!(render_object(&watcom, "a b.obj"), "a b.obj");
    }
}
