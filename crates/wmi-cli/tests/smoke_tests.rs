//! Smoke tests for the wmi-watch binary

#![allow(deprecated)] // Command::cargo_bin
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn wmi_watch() -> Command {
    let mut cmd = Command::cargo_bin("wmi-watch").expect("wmi-watch binary should exist");
    cmd.env_remove("WMI_CONFIG").env_remove("WMI_BASE_URL");
    cmd
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_version_flag() {
    wmi_watch()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_help_flag() {
    wmi_watch()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("watch"))
        .stdout(predicate::str::contains("mutate"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_no_args_fails() {
    wmi_watch().assert().failure();
}

#[test]
fn test_watch_help() {
    wmi_watch()
        .args(["watch", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--search-columns"))
        .stdout(predicate::str::contains("--max-batches"));
}

// ============================================================================
// Config Tests
// ============================================================================

#[test]
fn test_config_defaults() {
    wmi_watch()
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("retry_delay_ms: 5000"))
        .stdout(predicate::str::contains("grace_period_ms: 2000"));
}

#[test]
fn test_config_json() {
    wmi_watch()
        .args(["config", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"retry_delay_ms\": 5000"));
}

#[test]
fn test_config_file_and_base_url_override() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("wmi.yaml");
    fs::write(&path, "retry_delay_ms: 1500\n").unwrap();

    wmi_watch()
        .arg("config")
        .arg("--config")
        .arg(&path)
        .args(["--base-url", "http://wmi.example:3356/"])
        .assert()
        .success()
        .stdout(predicate::str::contains("retry_delay_ms: 1500"))
        .stdout(predicate::str::contains("http://wmi.example:3356"));
}

#[test]
fn test_bad_config_file_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("wmi.yaml");
    fs::write(&path, "retry_delay_ms: [not, a, number]\n").unwrap();

    wmi_watch()
        .arg("config")
        .arg("--config")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

// ============================================================================
// Mutate Tests
// ============================================================================

#[test]
fn test_mutate_relative_path_fails() {
    wmi_watch()
        .args(["mutate", "users/mod/1001"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("path must start with /"));
}

#[test]
fn test_mutate_unreachable_server_fails() {
    wmi_watch()
        .args(["--base-url", "http://127.0.0.1:1", "mutate", "/users/mod/1001/gecos/Bob"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}
