//! Integration tests for the `solarflow` CLI binary.
//!
//! Argument parsing, config handling and error exit codes run without any
//! network; the `sites` and `devices` tests point the binary at a wiremock
//! server through a temporary config file.
#![allow(clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `solarflow` binary with env isolation.
fn solarflow_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("solarflow");
    cmd.env("HOME", "/tmp/solarflow-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/solarflow-cli-test-nonexistent")
        .env_remove("SOLARFLOW_CONFIG")
        .env_remove("SOLARFLOW_OUTPUT")
        .env_remove("SOLARFLOW_LOG_FORMAT")
        .env_remove("SOLARFLOW_BASE_URL")
        .env_remove("RUST_LOG");
    cmd
}

fn write_config(dir: &Path, contents: &str) -> PathBuf {
    let path = dir.join("config.toml");
    std::fs::write(&path, contents).unwrap();
    path
}

fn account_config(base_url: &str) -> String {
    format!(
        r#"
base_url = "{base_url}"
request_retries = 1

[[accounts]]
name = "home"
api_key = "test-key"
"#
    )
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

async fn mount_ok(server: &MockServer, route: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mock_api() -> MockServer {
    let server = MockServer::start().await;
    mount_ok(&server, "/version/current", json!({ "version": { "release": "1.0" } })).await;
    mount_ok(
        &server,
        "/sites/list",
        json!({ "sites": { "count": 1, "site": [{
            "id": 42,
            "name": "Home",
            "peakPower": 6.5,
            "status": "Active",
            "location": { "city": "Lyon" }
        }] } }),
    )
    .await;
    mount_ok(
        &server,
        "/site/42/inventory.json",
        json!({ "Inventory": { "inverters": [{
            "SN": "7e12abcd-34",
            "name": "Roof",
            "cpuVersion": "4-15-123456",
            "model": "SE5000H",
            "manufacturer": "SolarEdge"
        }] } }),
    )
    .await;
    mount_ok(
        &server,
        "/site/42/currentPowerFlow.json",
        json!({ "siteCurrentPowerFlow": {
            "unit": "kW",
            "PV": { "status": "Active", "currentPower": 3.5 },
            "connections": []
        } }),
    )
    .await;
    server
}

/// Run the binary off the async runtime so the mock server keeps serving.
async fn run_blocking(mut cmd: assert_cmd::Command) -> std::process::Output {
    tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap()
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = solarflow_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    solarflow_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("run")
            .and(predicate::str::contains("sites"))
            .and(predicate::str::contains("devices"))
            .and(predicate::str::contains("config")),
    );
}

#[test]
fn test_version_flag() {
    solarflow_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("solarflow"));
}

#[test]
fn test_invalid_output_format() {
    solarflow_cmd()
        .args(["sites", "--output", "xml"])
        .assert()
        .code(2);
}

// ── Config commands ─────────────────────────────────────────────────

#[test]
fn test_config_path_honors_flag() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom.toml");
    solarflow_cmd()
        .args(["config", "path", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("custom.toml"));
}

#[test]
fn test_config_show_masks_api_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"
[[accounts]]
name = "home"
api_key = "super-secret"
"#,
    );

    solarflow_cmd()
        .args(["config", "show", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout(
            predicate::str::contains("********")
                .and(predicate::str::contains("super-secret").not())
                .and(predicate::str::contains("poll_interval_secs = 600")),
        );
}

#[test]
fn test_missing_accounts_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "eve_history = true\n");

    let output = solarflow_cmd()
        .args(["sites", "--config"])
        .arg(&path)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let text = combined_output(&output);
    assert!(text.contains("No accounts configured"), "got:\n{text}");
}

#[test]
fn test_invalid_base_url_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), &account_config("not a url"));

    solarflow_cmd()
        .args(["devices", "--config"])
        .arg(&path)
        .assert()
        .code(2);
}

// ── Commands against a mock API ─────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_sites_json_output() {
    let server = mock_api().await;
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), &account_config(&server.uri()));

    let mut cmd = solarflow_cmd();
    cmd.args(["sites", "-o", "json-compact", "--config"]).arg(&path);
    let output = run_blocking(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    let sites: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(sites[0]["account"], "home");
    assert_eq!(sites[0]["id"], 42);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_devices_prints_normalized_records() {
    let server = mock_api().await;
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), &account_config(&server.uri()));

    let mut cmd = solarflow_cmd();
    cmd.args(["devices", "-o", "json", "--config"]).arg(&path);
    let output = run_blocking(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    let devices: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let device = &devices[0];
    assert_eq!(device["serial"], "7E12ABCD-34");
    assert_eq!(device["software_version"], "4.15.123456");
    assert_eq!(device["description"], "Roof  Lyon");
    assert_eq!(device["power_flow"]["pv"]["current_power"], 3500.0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rejected_key_exits_with_auth_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/version/current"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Invalid token"))
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), &account_config(&server.uri()));

    let mut cmd = solarflow_cmd();
    cmd.args(["devices", "--config"]).arg(&path);
    let output = run_blocking(cmd).await;

    assert_eq!(output.status.code(), Some(3), "{}", combined_output(&output));
}
