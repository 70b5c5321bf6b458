//! CLI integration tests
//!
//! These tests verify the command-line interface behavior, including:
//! - Command parsing and validation
//! - Error handling before any network or docker side effect
//! - Exit codes

use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

/// Helper to get the path to the shippy binary
fn shippy_bin() -> PathBuf {
    // In tests, the binary should be at target/debug/shippy
    let mut path = env::current_exe()
        .expect("Failed to get current executable path")
        .parent()
        .expect("No parent")
        .parent()
        .expect("No parent")
        .to_path_buf();

    // If we're in deps/, go up one more level
    if path.ends_with("deps") {
        path = path.parent().expect("No parent").to_path_buf();
    }

    path.join("shippy")
}

/// Helper to write a valid build config into a temp dir
fn write_valid_config(dir: &TempDir) -> PathBuf {
    let config = r#"{
  "application_image": "tryghost/ghost",
  "application_repository": "https://github.com/tryghost/ghost",
  "application_source_mountpoint": "/usr/src/ghost",
  "application_config": {
    "NODE_ENV": "production"
  },
  "database_image": "mysql/mysql-server",
  "database_config": {
    "MYSQL_DATABASE": "ghost"
  }
}"#;
    let path = dir.path().join("buildconfig.json");
    fs::write(&path, config).expect("Failed to write build config");
    path
}

#[test]
fn test_cli_help() {
    let output = Command::new(shippy_bin())
        .arg("--help")
        .output()
        .expect("Failed to execute shippy");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("shippy"));
    assert!(stdout.contains("deploy"));
    assert!(stdout.contains("stop"));
    assert!(stdout.contains("terminate"));
}

#[test]
fn test_cli_version() {
    let output = Command::new(shippy_bin())
        .arg("--version")
        .output()
        .expect("Failed to execute shippy");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("shippy"));
}

#[test]
fn test_deploy_requires_sha() {
    let output = Command::new(shippy_bin())
        .args(["deploy", "buildconfig.json"])
        .output()
        .expect("Failed to execute shippy");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("SHA") || stderr.contains("required"));
}

#[test]
fn test_deploy_missing_config_exits_nonzero() {
    let workdir = TempDir::new().expect("Failed to create temp dir");

    let output = Command::new(shippy_bin())
        .args(["deploy", "/nonexistent/buildconfig.json", "abc123"])
        .args(["--workdir", workdir.path().to_str().unwrap()])
        .output()
        .expect("Failed to execute shippy");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("buildconfig.json"));

    // Config resolution failed before side effects: no workspace created
    assert_eq!(fs::read_dir(workdir.path()).unwrap().count(), 0);
}

#[test]
fn test_deploy_invalid_config_reports_violations() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = dir.path().join("buildconfig.json");
    fs::write(
        &config_path,
        r#"{"application_image": "tryghost/ghost", "application_config": {}}"#,
    )
    .expect("Failed to write config");

    let workdir = TempDir::new().expect("Failed to create temp dir");
    let output = Command::new(shippy_bin())
        .args(["deploy", config_path.to_str().unwrap(), "abc123"])
        .args(["--workdir", workdir.path().to_str().unwrap()])
        .output()
        .expect("Failed to execute shippy");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    // Every missing field is reported, not just the first
    assert!(stderr.contains("application_repository"));
    assert!(stderr.contains("database_image"));
    assert!(stderr.contains("database_config"));
}

#[test]
fn test_deploy_malformed_json_exits_nonzero() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = dir.path().join("buildconfig.json");
    fs::write(&config_path, "{ not json").expect("Failed to write config");

    let output = Command::new(shippy_bin())
        .args(["deploy", config_path.to_str().unwrap(), "abc123"])
        .output()
        .expect("Failed to execute shippy");

    assert!(!output.status.success());
}

#[test]
fn test_stop_with_valid_config_reaches_compose() {
    // Without a docker daemon the stop command must still get past
    // config resolution and fail (if at all) only at the compose call.
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_valid_config(&dir);
    let workdir = TempDir::new().expect("Failed to create temp dir");

    let output = Command::new(shippy_bin())
        .args(["stop", config_path.to_str().unwrap(), "abc123"])
        .args(["--workdir", workdir.path().to_str().unwrap()])
        .output()
        .expect("Failed to execute shippy");

    let stderr = String::from_utf8_lossy(&output.stderr);
    // Config errors would mention the config path; past that point the
    // only failure mode is the docker invocation itself
    assert!(!stderr.contains("failed validation"));

    // The workspace for the derived (app, sha) pair exists either way
    assert!(workdir.path().join("ghost_abc123").is_dir());
}
