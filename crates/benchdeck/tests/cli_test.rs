//! Integration tests for the `benchdeck` CLI binary.
//!
//! Argument parsing, help output, exit codes and a few round-trips against
//! a wiremock controller. Never touches the user's real configuration.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `benchdeck` binary with env isolation.
fn benchdeck_cmd(home: &std::path::Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("benchdeck");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home)
        .env("NO_COLOR", "1")
        .env_remove("BENCHDECK_PROFILE")
        .env_remove("BENCHDECK_URL")
        .env_remove("BENCHDECK_OUTPUT")
        .env_remove("BENCHDECK_INSECURE")
        .env_remove("BENCHDECK_TIMEOUT")
        .env_remove("RUST_LOG");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
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
    let home = tempfile::tempdir().unwrap();
    let output = benchdeck_cmd(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    assert!(combined_output(&output).contains("Usage"));
}

#[test]
fn test_help_lists_commands() {
    let home = tempfile::tempdir().unwrap();
    benchdeck_cmd(home.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("service")
            .and(predicate::str::contains("all-off"))
            .and(predicate::str::contains("rails"))
            .and(predicate::str::contains("usb")),
    );
}

#[test]
fn test_version_flag() {
    let home = tempfile::tempdir().unwrap();
    benchdeck_cmd(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("benchdeck"));
}

#[test]
fn test_completions_zsh() {
    let home = tempfile::tempdir().unwrap();
    benchdeck_cmd(home.path())
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

#[test]
fn test_config_path() {
    let home = tempfile::tempdir().unwrap();
    benchdeck_cmd(home.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let home = tempfile::tempdir().unwrap();
    let output = benchdeck_cmd(home.path()).arg("frobnicate").output().unwrap();
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("frobnicate"));
}

#[test]
fn test_usb_port_out_of_range() {
    let home = tempfile::tempdir().unwrap();
    benchdeck_cmd(home.path())
        .args(["usb", "9"])
        .assert()
        .code(2);
}

#[test]
fn test_all_off_requires_yes_without_terminal() {
    let home = tempfile::tempdir().unwrap();
    benchdeck_cmd(home.path())
        .args(["--url", "http://127.0.0.1:9", "all-off"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("requires confirmation"));
}

#[test]
fn test_unknown_bench_is_usage_error() {
    let home = tempfile::tempdir().unwrap();
    benchdeck_cmd(home.path())
        .args(["--url", "http://127.0.0.1:9", "service", "bench7", "on"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("bench7"));
}

#[test]
fn test_unknown_channel_without_force() {
    let home = tempfile::tempdir().unwrap();
    benchdeck_cmd(home.path())
        .args(["--url", "http://127.0.0.1:9", "set", "bench9_5v", "on"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("--force"));
}

#[test]
fn test_missing_profile() {
    let home = tempfile::tempdir().unwrap();
    benchdeck_cmd(home.path())
        .args(["--profile", "rig9", "state"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("rig9"));
}

#[test]
fn test_unreachable_controller() {
    let home = tempfile::tempdir().unwrap();
    benchdeck_cmd(home.path())
        .args(["--url", "http://127.0.0.1:9", "--timeout", "2", "state"])
        .assert()
        .code(7)
        .stderr(predicate::str::contains("Could not connect"));
}

// ── Against a mock controller ───────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_state_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/state"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "state": { "bench2_5v": true, "bench2_12v": true, "port2_vcc_en": false }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/bench_names"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "b1": "", "b2": "Scope rig", "b3": "", "b4": ""
        })))
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    let mut cmd = benchdeck_cmd(home.path());
    cmd.args(["--url", &server.uri(), "--output", "json", "state"]);
    let output = run_blocking(cmd).await;
    assert!(output.status.success(), "{}", combined_output(&output));

    let benches: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(benches[1]["name"], "Scope rig");
    assert_eq!(benches[1]["5v"], true);
    assert_eq!(benches[1]["hv"], false);
    assert_eq!(benches[0]["name"], "Bench 1");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_set_posts_channel() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/set"))
        .and(body_json(json!({ "channel": "lights", "state": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true, "channel": "lights", "state": true
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/state"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "state": { "lights": true } })),
        )
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    let mut cmd = benchdeck_cmd(home.path());
    cmd.args(["--url", &server.uri(), "--output", "plain", "set", "lights", "on"]);
    let output = run_blocking(cmd).await;
    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "lights on");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_backend_rejection_exit_code() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/usb"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(json!({ "ok": false, "error": "MCP write failed" })),
        )
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    let mut cmd = benchdeck_cmd(home.path());
    cmd.args(["--url", &server.uri(), "usb", "3", "--vbus", "off"]);
    let output = run_blocking(cmd).await;
    assert_eq!(output.status.code(), Some(5), "{}", combined_output(&output));
    assert!(combined_output(&output).contains("MCP write failed"));
}
