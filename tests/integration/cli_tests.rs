//! CLI integration tests
//!
//! These tests run the `typeshake` binary against the fixture module and
//! throwaway modules in temporary directories.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

fn fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// Get the path to the fixture module
fn fixture_module() -> PathBuf {
    fixtures().join("shop")
}

fn typeshake() -> Command {
    Command::cargo_bin("typeshake").expect("binary should be built")
}

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_cli_help() {
    typeshake()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("typeshake"))
        .stdout(predicate::str::contains("--entry"))
        .stdout(predicate::str::contains("--explain"));
}

#[test]
fn test_cli_version() {
    typeshake()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("typeshake"));
}

// ============================================================================
// Shaking the fixture module
// ============================================================================

#[test]
fn test_cli_terminal_report() {
    typeshake()
        .arg(fixture_module())
        .args(["--entry", "./api", "--quiet"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 9 unreachable declarations"))
        .stdout(predicate::str::contains("example.com/shop/models"))
        .stdout(predicate::str::contains("Orphan"));
}

#[test]
fn test_cli_json_report() {
    let output = typeshake()
        .arg(fixture_module())
        .args(["-e", "example.com/shop/api", "--format", "json", "-q"])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");

    assert_eq!(report["version"], "1");
    assert_eq!(report["removed_count"], 9);
    assert_eq!(report["packages"].as_array().map(Vec::len), Some(5));
    assert_eq!(report["unrepresentable"][0]["field"], "Callback");
    assert_eq!(report["unrepresentable"][0]["obstruction"], "func");
}

#[test]
fn test_cli_json_to_file() {
    let temp = tempfile::tempdir().expect("Failed to create temp dir");
    let out = temp.path().join("model.json");

    typeshake()
        .arg(fixture_module())
        .args(["-e", "./api", "-f", "json", "-q", "-o"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let report: serde_json::Value = serde_json::from_str(&fs::read_to_string(out).unwrap()).unwrap();
    assert_eq!(report["removed_count"], 9);
}

#[test]
fn test_cli_json_stdout_stays_parseable_with_side_output() {
    let output = typeshake()
        .arg(fixture_module())
        .args(["-e", "./api", "-f", "json", "-q", "--list", "--detect-cycles"])
        .args(["--explain", "example.com/shop/meta/v1.ObjectMeta"])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be only JSON");
    assert_eq!(report["removed_count"], 9);

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("struct Orphan"));
    assert!(stderr.contains("example.com/shop/models.Customer -> example.com/shop/meta/v1.ObjectMeta"));
    assert!(stderr.contains("dead reference cycles") || stderr.contains("dead cycles"));
}

#[test]
fn test_cli_local_types_keep_more() {
    typeshake()
        .arg(fixture_module())
        .args(["-e", "./api", "--local-types", "-q"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 8 unreachable declarations"));
}

#[test]
fn test_cli_explain() {
    typeshake()
        .arg(fixture_module())
        .args(["-e", "./api", "-q", "--explain", "example.com/shop/meta/v1.ObjectMeta"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "example.com/shop/api.Order -> example.com/shop/models.Customer -> example.com/shop/meta/v1.ObjectMeta",
        ));
}

#[test]
fn test_cli_explain_unreachable() {
    typeshake()
        .arg(fixture_module())
        .args(["-e", "./api", "-q", "--explain", "example.com/shop/models.Orphan"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not reachable"));
}

#[test]
fn test_cli_list() {
    typeshake()
        .arg(fixture_module())
        .args(["-e", "./api", "-q", "--list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("struct Orphan"))
        .stdout(predicate::str::contains("alias Status"));
}

#[test]
fn test_cli_config_file() {
    let temp = tempfile::tempdir().expect("Failed to create temp dir");
    let config = temp.path().join("typeshake.yaml");
    fs::write(
        &config,
        "entry_packages:\n  - ./models\nreport:\n  format: json\n",
    )
    .unwrap();

    let output = typeshake()
        .arg(fixture_module())
        .arg("-q")
        .arg("--config")
        .arg(&config)
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    // models keeps its own 7 declarations plus meta.ObjectMeta
    assert_eq!(report["removed_count"], 6);
}

// ============================================================================
// Build constraints and required modules
// ============================================================================

fn sys_stat_doc(goos: &str) -> String {
    let output = typeshake()
        .arg(fixture_module())
        .args(["-e", "./sys", "-f", "json", "-q", "--goarch", "amd64", "--goos", goos])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let sys = report["packages"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["path"] == "example.com/shop/sys")
        .expect("sys package in report")
        .clone();
    sys["declarations"][0]["doc"].as_str().unwrap_or_default().to_string()
}

#[test]
fn test_cli_goos_selects_platform_file() {
    assert_eq!(sys_stat_doc("linux"), "Stat is file metadata as reported by Linux.");
    assert_eq!(sys_stat_doc("windows"), "Stat is file metadata on platforms other than Linux.");
}

#[test]
fn test_cli_loads_required_modules() {
    let output = typeshake()
        .arg(fixtures().join("deps"))
        .args(["-e", "./api", "-f", "json", "-q", "--goos", "linux", "--modcache"])
        .arg(fixtures().join("modcache"))
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["packages"].as_array().map(Vec::len), Some(4));
    assert_eq!(report["removed_count"], 2);
    assert_eq!(report["removed"][1]["package"], "github.com/AcmeCorp/units");
    assert_eq!(report["removed"][1]["name"], "Volume");
}

#[test]
fn test_cli_no_deps_keeps_to_the_module() {
    let output = typeshake()
        .arg(fixtures().join("deps"))
        .args(["-e", "./api", "-f", "json", "-q", "--no-deps"])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["packages"].as_array().map(Vec::len), Some(1));
    assert_eq!(report["removed_count"], 0);
}

// ============================================================================
// Failure modes
// ============================================================================

#[test]
fn test_cli_syntax_error_fails() {
    let temp = tempfile::tempdir().expect("Failed to create temp dir");
    write(temp.path(), "go.mod", "module example.com/bad\n");
    write(temp.path(), "api/api.go", "package api\n\ntype Broken struct {\n");

    typeshake()
        .arg(temp.path())
        .args(["-e", "./api"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Syntax error"));
}

#[test]
fn test_cli_unresolved_qualifier_fails() {
    let temp = tempfile::tempdir().expect("Failed to create temp dir");
    write(temp.path(), "go.mod", "module example.com/bad\n");
    write(
        temp.path(),
        "api/api.go",
        "package api\n\ntype T struct {\n    X missing.Thing\n}\n",
    );

    typeshake()
        .arg(temp.path())
        .args(["-e", "./api"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing"));
}

#[test]
fn test_cli_missing_module_fails() {
    let temp = tempfile::tempdir().expect("Failed to create temp dir");
    write(temp.path(), "a.go", "package a\n");

    typeshake().arg(temp.path()).assert().failure();
}

#[test]
fn test_cli_module_flag_replaces_go_mod() {
    let temp = tempfile::tempdir().expect("Failed to create temp dir");
    write(temp.path(), "a/a.go", "package a\n\ntype A struct{}\n");

    typeshake()
        .arg(temp.path())
        .args(["--module", "example.com/flag", "-e", "./a", "-q"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to remove"));
}
