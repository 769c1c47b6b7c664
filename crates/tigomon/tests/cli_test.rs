//! Integration tests for the `tigomon` CLI binary.
//!
//! Argument parsing, help output, completions, config handling, and the
//! gateway commands against a wiremock stand-in for the CCA.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const STATUS_PAGE: &str = include_str!("../../tigomon-api/tests/fixtures/meshdatapower.html");
const SUMMARY_PAGE: &str = include_str!("../../tigomon-api/tests/fixtures/lmudui.html");
const VERSIONS_PAGE: &str = include_str!("../../tigomon-api/tests/fixtures/meshnodever.html");
const IDENTITIES_PAGE: &str = include_str!("../../tigomon-api/tests/fixtures/meshnodeinfo.html");

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a command for the `tigomon` binary with env isolation.
///
/// Clears all `TIGOMON_*` env vars and points config directories at
/// `config_home` so tests never touch the user's real configuration.
fn tigomon_cmd_in(config_home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("tigomon");
    cmd.env("HOME", config_home)
        .env("XDG_CONFIG_HOME", config_home)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("TIGOMON_PROFILE")
        .env_remove("TIGOMON_HOST")
        .env_remove("TIGOMON_USERNAME")
        .env_remove("TIGOMON_PASSWORD")
        .env_remove("TIGOMON_OUTPUT")
        .env_remove("TIGOMON_TIMEOUT");
    cmd
}

fn tigomon_cmd() -> assert_cmd::Command {
    tigomon_cmd_in(Path::new("/tmp/tigomon-cli-test-nonexistent"))
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

async fn mount_page(server: &MockServer, page: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn gateway() -> MockServer {
    let server = MockServer::start().await;
    mount_page(&server, "/cgi-bin/meshdatapower", STATUS_PAGE).await;
    mount_page(&server, "/cgi-bin/lmudui", SUMMARY_PAGE).await;
    mount_page(&server, "/cgi-bin/meshnodever", VERSIONS_PAGE).await;
    mount_page(&server, "/cgi-bin/meshnodeinfo", IDENTITIES_PAGE).await;
    server
}

fn host_of(server: &MockServer) -> String {
    server.address().to_string()
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = tigomon_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    tigomon_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("Tigo")
            .and(predicate::str::contains("status"))
            .and(predicate::str::contains("watch"))
            .and(predicate::str::contains("inventory")),
    );
}

#[test]
fn test_version_flag() {
    tigomon_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("tigomon"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_zsh() {
    tigomon_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

#[test]
fn test_completions_bash() {
    tigomon_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let output = tigomon_cmd().arg("foobar").output().unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_status_without_gateway_is_usage_error() {
    tigomon_cmd()
        .arg("status")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No gateway configured"));
}

#[test]
fn test_unknown_profile() {
    tigomon_cmd()
        .args(["-p", "garage", "status"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("garage"));
}

#[test]
fn test_invalid_output_format() {
    tigomon_cmd()
        .args(["--host", "10.0.0.2", "-o", "xml", "status"])
        .assert()
        .code(2);
}

#[test]
fn test_invalid_watch_interval() {
    tigomon_cmd()
        .args(["--host", "10.0.0.2", "watch", "--interval", "soon"])
        .assert()
        .code(2);
}

#[test]
fn test_unreachable_gateway_exit_code() {
    // Nothing listens on the discard port
    tigomon_cmd()
        .args(["--host", "127.0.0.1:9", "--timeout", "2", "status"])
        .assert()
        .code(7)
        .stderr(predicate::str::contains("Could not connect"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path() {
    let dir = tempfile::tempdir().unwrap();
    tigomon_cmd_in(dir.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_profiles_and_show() {
    let dir = tempfile::tempdir().unwrap();
    let cfg_dir = dir.path().join("tigomon");
    std::fs::create_dir_all(&cfg_dir).unwrap();
    std::fs::write(
        cfg_dir.join("config.toml"),
        r#"
default_profile = "roof"

[profiles.roof]
host = "10.0.0.40"
username = "Tigo"
password = "$olar"

[profiles.garage]
host = "10.0.0.41"
"#,
    )
    .unwrap();

    tigomon_cmd_in(dir.path())
        .args(["config", "profiles", "-o", "plain"])
        .assert()
        .success()
        .stdout(predicate::str::diff("garage\nroof\n"));

    tigomon_cmd_in(dir.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("10.0.0.40")
                .and(predicate::str::contains("****"))
                .and(predicate::str::contains("$olar").not()),
        );
}

// ── Gateway commands ────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_status_plain_lists_panels() {
    let server = gateway().await;

    let output = tigomon_cmd()
        .args(["--host", &host_of(&server), "-o", "plain", "status"])
        .output()
        .unwrap();

    assert!(output.status.success(), "{}", combined_output(&output));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("A1\t248.1"), "stdout:\n{stdout}");
    assert_eq!(stdout.lines().count(), 5);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_status_json_is_a_snapshot() {
    let server = gateway().await;

    let output = tigomon_cmd()
        .args(["--host", &host_of(&server), "-o", "json", "status"])
        .output()
        .unwrap();

    assert!(output.status.success(), "{}", combined_output(&output));
    let snap: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(snap["devices"].as_object().unwrap().len(), 5);
    assert_eq!(snap["devices"]["mac-04c05b300001"]["status"], "active");
    assert_eq!(snap["gateway"]["unit_id"], "04C05B100777");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_status_group_filter() {
    let server = gateway().await;

    let output = tigomon_cmd()
        .args(["--host", &host_of(&server), "-o", "plain", "status", "-g", "B"])
        .output()
        .unwrap();

    assert!(output.status.success(), "{}", combined_output(&output));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let labels: Vec<_> = stdout
        .lines()
        .map(|l| l.split('\t').next().unwrap())
        .collect();
    assert_eq!(labels, vec!["B1", "B2"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_status_rejected_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    tigomon_cmd()
        .args(["--host", &host_of(&server), "-u", "Tigo", "status"])
        .env("TIGOMON_PASSWORD", "wrong")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Authentication failed"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_gateway_plain_prints_unit_id() {
    let server = gateway().await;

    tigomon_cmd()
        .args(["--host", &host_of(&server), "-o", "plain", "gateway"])
        .assert()
        .success()
        .stdout(predicate::str::diff("04C05B100777\n"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_inventory_table() {
    let server = gateway().await;

    tigomon_cmd()
        .args(["--host", &host_of(&server), "inventory"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("TS4-A-O")
                .and(predicate::str::contains("3.6.1"))
                .and(predicate::str::contains("04C05B300001")),
        );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_watch_stops_after_count() {
    let server = gateway().await;

    let output = tigomon_cmd()
        .args([
            "--host",
            &host_of(&server),
            "-o",
            "json-compact",
            "watch",
            "--interval",
            "1s",
            "--count",
            "2",
        ])
        .timeout(std::time::Duration::from_secs(20))
        .output()
        .unwrap();

    assert!(output.status.success(), "{}", combined_output(&output));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let versions: Vec<u64> = stdout
        .lines()
        .map(|l| {
            let v: serde_json::Value = serde_json::from_str(l).unwrap();
            v["version"].as_u64().unwrap()
        })
        .collect();
    assert_eq!(versions.len(), 2);
    assert!(versions[0] < versions[1]);
}
