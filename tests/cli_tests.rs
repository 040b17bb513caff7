//! Integration tests for CLI execution using `assert_cmd`.
//!
//! These tests invoke the compiled binary and verify generated files, the
//! backend listing, the submission report and error logging on stderr.

use anyhow::{Context, Result, ensure};
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn kiln() -> Result<Command> {
    Command::cargo_bin("kiln").context("locate kiln binary")
}

fn copy_fixture(name: &str, dir: &Path) -> Result<()> {
    let target = dir.join("Kilnfile");
    fs::copy(format!("tests/data/{name}"), &target)
        .with_context(|| format!("copy {name} to {}", target.display()))?;
    Ok(())
}

#[test]
fn generate_writes_build_tree() -> Result<()> {
    let temp = tempdir().context("create temp dir")?;
    copy_fixture("minimal.yml", temp.path())?;
    kiln()?
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("2 file(s) written, 0 unchanged"));

    let makefile = fs::read_to_string(temp.path().join("build/Makefile")).context("read Makefile")?;
    ensure!(makefile.contains("include build.make"), "{makefile}");
    let fragment =
        fs::read_to_string(temp.path().join("build/build.make")).context("read fragment")?;
    ensure!(fragment.contains("hello.txt:"), "{fragment}");

    kiln()?
        .current_dir(temp.path())
        .arg("generate")
        .assert()
        .success()
        .stdout(predicate::str::contains("0 file(s) written, 2 unchanged"));
    Ok(())
}

#[test]
fn directory_and_backend_flags_are_honoured() -> Result<()> {
    let temp = tempdir().context("create temp dir")?;
    let work = temp.path().join("work");
    fs::create_dir_all(&work).context("create work directory")?;
    copy_fixture("wrapped.yml", &work)?;
    kiln()?
        .current_dir(temp.path())
        .args(["-C", "work", "-B", "out", "-G", "watcom"])
        .assert()
        .success();
    let makefile = fs::read_to_string(work.join("out/Makefile")).context("read Makefile")?;
    ensure!(makefile.contains("!include"), "{makefile}");
    ensure!(work.join("out/common/JavaDependencies.list").exists());
    Ok(())
}

#[test]
fn source_paths_in_fragments_are_absolute() -> Result<()> {
    let temp = tempdir().context("create temp dir")?;
    let work = temp.path().join("proj");
    fs::create_dir_all(&work).context("create project directory")?;
    copy_fixture("wrapped.yml", &work)?;
    kiln()?
        .current_dir(temp.path())
        .args(["-C", "proj"])
        .assert()
        .success();
    let fragment =
        fs::read_to_string(work.join("build/common/build.make")).context("read fragment")?;
    let header = fragment
        .split_whitespace()
        .find(|token| token.ends_with("vtkObject.h"))
        .context("header dependency")?;
    ensure!(Path::new(header).is_absolute(), "{header} should be absolute");
    ensure!(header.ends_with("proj/common/vtkObject.h"), "{header}");
    ensure!(fragment.contains("vtkCommon.dir/vtkObject.o"), "{fragment}");
    ensure!(!fragment.contains("vtkCommon.dir/proj/"), "{fragment}");
    Ok(())
}

#[test]
fn definitions_on_the_command_line_override_the_project() -> Result<()> {
    let temp = tempdir().context("create temp dir")?;
    copy_fixture("wrapped.yml", temp.path())?;
    kiln()?
        .current_dir(temp.path())
        .args(["-D", "WRAP_JAVA=OFF"])
        .assert()
        .success();
    ensure!(!temp.path().join("build/common/JavaDependencies.list").exists());
    Ok(())
}

#[test]
fn custom_profiles_load_from_yaml() -> Result<()> {
    let temp = tempdir().context("create temp dir")?;
    copy_fixture("minimal.yml", temp.path())?;
    fs::write(
        temp.path().join("borland.yml"),
        "key: borland\nname: Borland Makefiles\nmake_program: make\nbuild_file: makefile.mak\n",
    )
    .context("write profile")?;
    kiln()?
        .current_dir(temp.path())
        .args(["--profile", "borland.yml"])
        .assert()
        .success();
    ensure!(temp.path().join("build/makefile.mak").exists());
    Ok(())
}

#[test]
fn backends_lists_builtin_profiles() -> Result<()> {
    kiln()?
        .arg("backends")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Unix Makefiles")
                .and(predicate::str::contains("Watcom WMake"))
                .and(predicate::str::contains("NMake Makefiles"))
                .and(predicate::str::contains("MinGW Makefiles")),
        );
    Ok(())
}

#[test]
fn submit_prints_resolved_configuration() -> Result<()> {
    let temp = tempdir().context("create temp dir")?;
    copy_fixture("minimal.yml", temp.path())?;
    let output = kiln()?
        .current_dir(temp.path())
        .args(["-D", "CTEST_DROP_SITE=dash.example.org", "submit"])
        .output()
        .context("run kiln submit")?;
    ensure!(output.status.success(), "submit should succeed");
    let json: serde_json::Value =
        serde_json::from_slice(&output.stdout).context("parse submit output")?;
    ensure!(json["drop_site"] == "dash.example.org", "{json}");
    ensure!(json["drop_method"] == "http", "{json}");
    ensure!(json.get("drop_site_user").is_none(), "{json}");
    Ok(())
}

#[test]
fn submit_rejects_unknown_arguments() -> Result<()> {
    let temp = tempdir().context("create temp dir")?;
    copy_fixture("minimal.yml", temp.path())?;
    kiln()?
        .current_dir(temp.path())
        .args(["submit", "BUILD"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("extra argument is `BUILD`"));
    Ok(())
}

#[test]
fn missing_project_file_is_logged_to_stderr() -> Result<()> {
    let temp = tempdir().context("create temp dir")?;
    kiln()?
        .current_dir(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"))
        .stdout(predicate::str::is_empty());
    Ok(())
}
