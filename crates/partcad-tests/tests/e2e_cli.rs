//! End-to-end CLI tests
//!
//! Drives the `partcad` binary inside a scratch package directory with an
//! isolated user config.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p partcad-tests --test e2e_cli
//! ```

use std::fs;

use partcad_core::{PackageManifest, MANIFEST_FILE};
use partcad_tests::fixtures::{write_file, SQUARE_OBJ, TRIANGLE_STL};
use partcad_tests::TestHarness;
use pretty_assertions::assert_eq;

fn manifest(harness: &TestHarness) -> PackageManifest {
    let content = fs::read_to_string(harness.path().join(MANIFEST_FILE)).unwrap();
    serde_yaml::from_str(&content).unwrap()
}

fn initialized() -> TestHarness {
    let harness = TestHarness::new();
    harness.run_cli(&["init"]).assert_success();
    harness
}

#[test]
fn test_version() {
    let harness = TestHarness::new();
    let result = harness.run_cli(&["version"]);
    result.assert_success();
    assert!(result.stdout.contains("partcad-cli v"));
    assert!(result.stdout.contains("partcad-core v"));
}

#[test]
fn test_init_refuses_existing_package() {
    let harness = initialized();
    assert!(harness.path().join(MANIFEST_FILE).is_file());

    let again = harness.run_cli(&["init"]);
    again.assert_failure();
    assert!(again.stderr.contains("error:"));
}

#[test]
fn test_add_and_list_parts() {
    let harness = initialized();
    write_file(harness.path(), "triangle.stl", TRIANGLE_STL);

    harness
        .run_cli(&["add", "part", "stl", "triangle.stl", "--desc", "A facet"])
        .assert_success();
    // Same name twice.
    harness
        .run_cli(&["add", "part", "stl", "triangle.stl"])
        .assert_failure();
    // Not a part type.
    harness
        .run_cli(&["add", "part", "dxf", "triangle.stl", "--name", "other"])
        .assert_failure();

    let result = harness.run_cli(&["list", "parts"]);
    result.assert_success();
    assert!(result.stdout.contains("triangle"));
    assert!(result.stdout.contains("A facet"));

    let part = &manifest(&harness).parts["triangle"];
    assert_eq!(part.kind, "stl");
    assert_eq!(part.path.as_deref(), Some("triangle.stl"));
}

#[test]
fn test_convert_in_place() {
    let harness = initialized();
    write_file(harness.path(), "triangle.stl", TRIANGLE_STL);
    harness
        .run_cli(&["add", "part", "stl", "triangle.stl"])
        .assert_success();

    let dry = harness.run_cli(&["convert", "triangle", "-t", "obj", "--dry-run"]);
    dry.assert_success();
    assert!(!harness.path().join("triangle.obj").exists());

    harness
        .run_cli(&["convert", "triangle", "-t", "obj", "-i"])
        .assert_success();
    assert!(harness.path().join("triangle.obj").is_file());
    assert_eq!(manifest(&harness).parts["triangle"].kind, "obj");
}

#[test]
fn test_convert_rejects_unknown_target() {
    let harness = initialized();
    write_file(harness.path(), "triangle.stl", TRIANGLE_STL);
    harness
        .run_cli(&["add", "part", "stl", "triangle.stl"])
        .assert_success();

    let result = harness.run_cli(&["convert", "triangle", "-t", "dwg"]);
    result.assert_failure();
    assert_eq!(result.exit_code, 1);
    assert_eq!(manifest(&harness).parts["triangle"].kind, "stl");

    harness
        .run_cli(&["convert", "missing", "-t", "obj"])
        .assert_failure();
}

#[test]
fn test_import_with_target() {
    let harness = initialized();
    let source = tempfile::tempdir().unwrap();
    let obj = write_file(source.path(), "square.obj", SQUARE_OBJ);

    harness
        .run_cli(&["import", "part", obj.to_str().unwrap(), "-t", "stl"])
        .assert_success();
    assert!(harness.path().join("square.stl").is_file());

    let part = &manifest(&harness).parts["square"];
    assert_eq!(part.kind, "stl");
    assert_eq!(part.path, None);
}

#[test]
fn test_unknown_command() {
    let harness = TestHarness::new();
    let result = harness.run_cli(&["frobnicate"]);
    result.assert_failure();
    assert_ne!(result.exit_code, 0);
}

#[test]
fn test_user_alias() {
    let harness = TestHarness::with_config("commandsDir: commands\n");
    write_file(harness.path(), "commands/parts.cmd", "help: Show parts\nrun: list parts\n");
    harness.run_cli(&["init"]).assert_success();
    write_file(harness.path(), "triangle.stl", TRIANGLE_STL);
    harness
        .run_cli(&["add", "part", "stl", "triangle.stl"])
        .assert_success();

    let help = harness.run_cli(&["--help"]);
    help.assert_success();
    assert!(help.stdout.contains("parts"));

    let result = harness.run_cli(&["parts"]);
    result.assert_success();
    assert!(result.stdout.contains("triangle"));
}

#[test]
fn test_healthcheck_filters() {
    let harness = TestHarness::new();
    let result = harness.run_cli(&["healthcheck", "--filters", "filesystem"]);
    result.assert_success();
    assert!(result.stdout.contains("state-dir"));
    assert!(!result.stdout.contains("python ["));
    assert!(harness.path().join("state").is_dir());
}

#[test]
fn test_reset_clears_caches() {
    let harness = TestHarness::new();
    write_file(harness.path(), "state/git/0123456789abcdef/partcad.yaml", "");
    write_file(harness.path(), "state/runtime/venv/marker", "x");

    harness.run_cli(&["reset", "--dry-run"]).assert_success();
    assert!(harness.path().join("state/git").exists());

    harness.run_cli(&["reset"]).assert_success();
    assert!(!harness.path().join("state/git").exists());
    assert!(!harness.path().join("state/runtime/venv").exists());
    assert!(harness.path().join("state/runtime").is_dir());
}

#[test]
fn test_status_reports_cache_sizes() {
    let harness = TestHarness::new();
    write_file(harness.path(), "state/git/0123456789abcdef/partcad.yaml", &"x".repeat(4096));

    let result = harness.run_cli(&["status"]);
    result.assert_success();
    assert!(result.stdout.contains("PartCAD Status"));
    assert!(result.stdout.contains(&harness.path().join("state").display().to_string()));
    assert!(result.stdout.contains("git cache:"));
    assert!(result.stdout.contains("tar cache:"));
    assert!(result.stdout.contains("0.00MB"));
}

#[test]
fn test_config_shows_effective_settings() {
    let harness = TestHarness::with_config("wrapperTimeoutSecs: 7\n");
    let result = harness.run_cli(&["config"]);
    result.assert_success();
    assert!(result.stdout.contains("config.yaml"));
    assert!(result.stdout.contains("internalStateDir:"));
    assert!(result.stdout.contains("wrapperTimeoutSecs: 7"));
}

#[test]
fn test_update_without_imports() {
    let harness = initialized();
    let result = harness.run_cli(&["update", "--dry-run"]);
    result.assert_success();
    assert!(result.stdout.contains("No dependencies"));

    harness.run_cli(&["update"]).assert_success();
}
