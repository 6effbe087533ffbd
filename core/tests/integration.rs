use std::{fs, path::Path};

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;

fn host(cwd: &Path) -> Command {
    let mut cmd = Command::cargo_bin("colcon-host").unwrap();
    cmd.current_dir(cwd)
        .env("COLCON_HOST_CONFIG", cwd.join("no-such-host.toml"))
        .env_remove("COLCON_LOG_PATH")
        .env_remove("COLCON_LOG_LEVEL")
        .env_remove("COLCON_LOG")
        .env_remove("COLCON_EXTENSION_BLOCKLIST");
    cmd
}

/// The JSON report following any informational lines.
fn report(stdout: &[u8]) -> Value {
    let text = String::from_utf8_lossy(stdout);
    let start = text.find('{').expect("no report on stdout");
    serde_json::from_str(&text[start..]).unwrap()
}

fn workspace() -> (tempfile::TempDir, std::path::PathBuf) {
    let tmp = tempfile::tempdir().unwrap();
    let ws = tmp.path().canonicalize().unwrap().join("ws");
    fs::create_dir(&ws).unwrap();
    (tmp, ws)
}

#[test]
fn fresh_build_marks_workspace() {
    let (_tmp, ws) = workspace();
    let out = host(&ws).arg("build").assert().success();
    let report = report(&out.get_output().stdout);

    assert_eq!(report["verb"], "build");
    assert_eq!(report["args"]["build_base"], ws.join("build").to_str().unwrap());
    assert_eq!(report["args"]["install_base"], ws.join("install").to_str().unwrap());
    assert_eq!(report["log_path"], ws.join("log").to_str().unwrap());
    assert!(ws.join(".colcon_root").is_file());
    assert_eq!(
        fs::read_to_string(ws.join("build/.built_by")).unwrap(),
        "colcon"
    );
}

#[test]
fn build_from_subdirectory_redirects_to_top_level_workspace() {
    let (_tmp, ws) = workspace();
    let src = ws.join("src");
    fs::create_dir(&src).unwrap();
    host(&ws).arg("build").assert().success();

    let out = host(&src)
        .arg("build")
        .assert()
        .success()
        .stdout(predicate::str::contains("Using top-level workspace at"));
    let report = report(&out.get_output().stdout);
    assert_eq!(report["args"]["build_base"], ws.join("build").to_str().unwrap());
    assert_eq!(report["log_path"], ws.join("log").to_str().unwrap());
    assert!(!src.join("build").exists());
}

#[test]
fn foreign_build_directory_is_not_a_top_level_workspace() {
    let (_tmp, ws) = workspace();
    let src = ws.join("src");
    fs::create_dir_all(ws.join("build")).unwrap();
    fs::create_dir(&src).unwrap();
    fs::write(ws.join("build/.built_by"), "catkin_tools\n").unwrap();

    let out = host(&src)
        .arg("build")
        .assert()
        .success()
        .stdout(predicate::str::contains("Using top-level workspace").not());
    let report = report(&out.get_output().stdout);
    assert_eq!(report["args"]["build_base"], src.join("build").to_str().unwrap());
    assert!(src.join(".colcon_root").is_file());
}

#[test]
fn test_result_base_selects_the_marker_directory() {
    let (_tmp, ws) = workspace();
    let pkg = ws.join("src/pkg");
    fs::create_dir_all(ws.join("results")).unwrap();
    fs::create_dir_all(&pkg).unwrap();
    fs::write(ws.join("results/.built_by"), "colcon").unwrap();

    let out = host(&pkg)
        .args(["test-result", "--test-result-base", "results"])
        .assert()
        .success();
    let report = report(&out.get_output().stdout);
    assert_eq!(report["verb"], "test-result");
    assert_eq!(
        report["args"]["test_result_base"],
        ws.join("results").to_str().unwrap()
    );
}

#[test]
fn base_option_after_unknown_argument_still_redirects() {
    let (_tmp, ws) = workspace();
    let src = ws.join("src");
    fs::create_dir_all(ws.join("out")).unwrap();
    fs::create_dir(&src).unwrap();
    fs::write(ws.join("out/.built_by"), "colcon").unwrap();

    host(&src)
        .args(["build", "--bogus", "--build-base", "out"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("Using top-level workspace at"));
}

#[test]
fn verb_without_base_options_still_marks_root() {
    let (_tmp, ws) = workspace();
    for folder in ["log", "build", "install"] {
        fs::create_dir(ws.join(folder)).unwrap();
    }
    let src = ws.join("src");
    fs::create_dir(&src).unwrap();

    host(&src)
        .arg("extensions")
        .assert()
        .success()
        .stdout(predicate::str::contains("Using workspace root"));
    assert!(ws.join(".colcon_root").is_file());
    assert!(!src.join(".colcon_root").exists());
}

#[test]
fn blocklisted_decorators_leave_arguments_untouched() {
    let (_tmp, ws) = workspace();
    let out = host(&ws)
        .env(
            "COLCON_EXTENSION_BLOCKLIST",
            "workspace_root:top_level_workspace",
        )
        .arg("build")
        .assert()
        .success();
    let report = report(&out.get_output().stdout);
    assert_eq!(report["args"]["build_base"], "build");
    assert_eq!(report["log_path"], "log");
    assert!(!ws.join(".colcon_root").exists());

    host(&ws)
        .env("COLCON_EXTENSION_BLOCKLIST", "workspace_root")
        .arg("extensions")
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"top_level_workspace\s+1\.0\.0\s+75\s+Enabled").unwrap())
        .stdout(predicate::str::is_match(r"workspace_root\s+1\.0\.0\s+75\s+Blocked").unwrap());
}

#[test]
fn missing_verb_is_a_usage_error() {
    let (_tmp, ws) = workspace();
    host(&ws).assert().code(2);
}

#[test]
fn help_is_printed_and_succeeds() {
    let (_tmp, ws) = workspace();
    host(&ws)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("build"));
}
