//! Integration tests for build file rendering.
//!
//! Every built-in profile is rendered from the same configured project to
//! check determinism and the dialect differences the profiles encode.

use camino::Utf8Path;
use kiln::backend::profile::{BackendProfile, builtin};
use kiln::backend::{GenerateError, GeneratedFiles, GeneratorBackend};
use kiln::config::ProjectConfig;
use kiln::coordinator::{BuildLayout, GeneratorCoordinator};
use kiln::graph::RuleGraph;
use kiln::manifest;
use rstest::rstest;

const WRAPPED: &str = include_str!("data/wrapped.yml");

fn render(profile: BackendProfile) -> GeneratedFiles {
    let coordinator = GeneratorCoordinator::new(
        GeneratorBackend::new(profile),
        BuildLayout {
            source_root: "/src".into(),
            binary_root: "/build".into(),
        },
    );
    let manifest = manifest::from_str(WRAPPED).expect("manifest");
    let project = coordinator.configure(&manifest, &[]).expect("configure");
    coordinator.generate(&project).expect("render")
}

fn file<'a>(files: &'a GeneratedFiles, path: &str) -> &'a str {
    files
        .get(Utf8Path::new(path))
        .unwrap_or_else(|| panic!("missing {path}"))
}

#[rstest]
#[case("unix")]
#[case("watcom")]
#[case("nmake")]
#[case("mingw")]
fn rendering_is_deterministic(#[case] backend: &str) {
    let first = render(builtin(backend).expect("profile"));
    let second = render(builtin(backend).expect("profile"));
    assert_eq!(first, second);
}

#[rstest]
fn unix_layout_has_top_level_file_and_fragments() {
    let files = render(builtin("unix").expect("profile"));
    let paths: Vec<_> = files.iter().map(|(p, _)| p.as_str()).collect();
    assert_eq!(paths, ["Makefile", "common/build.make", "build.make"]);

    let top = file(&files, "Makefile");
    let all = top.find(".PHONY: all").expect("all target");
    let include = top.find("include common/build.make").expect("include");
    assert!(all < include);
    assert!(top.contains("KILN_GENERATOR = Unix Makefiles"));
    assert!(!top.contains("NULL ="));
    assert!(top.contains("SILENT_FLAGS = -s\n"));
    assert!(top.contains(concat!(
        ".PHONY: common/all\n",
        "common/all:\n",
        "\tmake $(SILENT_FLAGS) -f Makefile vtkCommonJavaClasses vtkCommon\n",
    )));
    assert!(!top.contains("./all"));

    let common = file(&files, "common/build.make");
    assert!(common.contains("vtkCommon_SOURCES = \\"));
    assert!(common.contains("vtkCommon.dir/vtkObjectJava.o"));
    assert!(common.contains(".PHONY: vtkCommonJavaClasses"));
    assert!(common.contains("# Generating config.h\n"));
    assert!(common.contains("\t@echo "));

    let root = file(&files, "build.make");
    assert!(root.contains("java_classes:"));
}

#[rstest]
fn watcom_uses_symbolic_attribute_and_its_own_syntax() {
    let files = render(builtin("watcom").expect("profile"));
    let top = file(&files, "Makefile");
    assert!(top.contains("NULL ="));
    assert!(top.contains("SILENT_FLAGS = -s -h"));
    assert!(top.contains("all: .SYMBOLIC &"));
    assert!(top.contains("!include \"common\\build.make\""));
    assert!(top.contains(
        "common/all: .SYMBOLIC\n\twmake $(SILENT_FLAGS) -f Makefile vtkCommonJavaClasses vtkCommon\n"
    ));

    let common = file(&files, "common/build.make");
    assert!(common.contains("vtkCommonJavaClasses: .SYMBOLIC &"));
    assert!(common.contains(".obj"));
    assert!(!common.contains(".PHONY"));
}

#[rstest]
#[case("nmake", "vtkCommon.dir\\vtkObjectJava.obj")]
#[case("mingw", "vtkCommon.dir/vtkObjectJava.obj")]
fn windows_dialects_use_obj_extension(#[case] backend: &str, #[case] object: &str) {
    let files = render(builtin(backend).expect("profile"));
    let common = file(&files, "common/build.make");
    assert!(common.contains(object), "{common}");
}

#[rstest]
fn directory_targets_use_the_configured_make_program() {
    let coordinator = GeneratorCoordinator::new(
        GeneratorBackend::new(builtin("unix").expect("profile")),
        BuildLayout {
            source_root: "/src".into(),
            binary_root: "/build".into(),
        },
    );
    let manifest = manifest::from_str(WRAPPED).expect("manifest");
    let overrides = [("KILN_MAKE_PROGRAM".to_owned(), "gmake".to_owned())];
    let project = coordinator.configure(&manifest, &overrides).expect("configure");
    let files = coordinator.generate(&project).expect("render");
    assert!(file(&files, "Makefile").contains("\tgmake $(SILENT_FLAGS) -f Makefile "));
}

#[rstest]
fn rendering_requires_enabled_languages() {
    let backend = GeneratorBackend::new(builtin("unix").expect("profile"));
    let err = backend
        .render(&RuleGraph::new(), &ProjectConfig::new())
        .expect_err("not enabled");
    assert!(matches!(err, GenerateError::LanguagesNotEnabled));
}

#[rstest]
fn enable_language_runs_once_per_pass() {
    let backend = GeneratorBackend::new(builtin("mingw").expect("profile"));
    let mut config = ProjectConfig::from_definitions([("KILN_CXX_COMPILER", "clang++")]);
    let languages = vec!["c".to_owned(), "cxx".to_owned()];
    backend.enable_language(&languages, &mut config).expect("enable");
    assert_eq!(config.get("KILN_C_COMPILER"), Some("gcc"));
    assert_eq!(config.get("KILN_CXX_COMPILER"), Some("clang++"));
    assert_eq!(config.get("MINGW"), Some("1"));
    assert!(backend.enable_language(&languages, &mut config).is_err());
}
