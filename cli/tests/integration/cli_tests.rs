//! Integration tests for the pushbox CLI surface: help, version, settings
//! validation and `check`.

#![allow(clippy::expect_used)]

use std::ffi::OsString;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Every variable the CLI reads, cleared so the host environment cannot leak in.
pub const PUSHBOX_VARS: &[&str] = &[
    "PUSHBOX_DEST",
    "PUSHBOX_PORT",
    "PUSHBOX_KEY",
    "PUSHBOX_SSH_OPTIONS",
    "PUSHBOX_CONTAINER",
    "PUSHBOX_CONTAINER_PATH",
    "PUSHBOX_RUNTIME",
    "PUSHBOX_PLATFORM",
    "PUSHBOX_NO_MULTIPLEX",
    "PUSHBOX_PROJECT_DIR",
    "PUSHBOX_RELEASE_DIR",
    "PUSHBOX_LOG_FILE",
    "PUSHBOX_SSH_BIN",
    "PUSHBOX_SCP_BIN",
    "PUSHBOX_TIMEOUT",
    "PUSHBOX_YES",
    "CI",
];

pub fn pushbox() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("pushbox"));
    for var in PUSHBOX_VARS {
        cmd.env_remove(var);
    }
    cmd.env("NO_COLOR", "1");
    cmd
}

/// A project with `package.json` at 1.4.0 and a complete Windows release.
pub fn release_project() -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    std::fs::write(dir.path().join("package.json"), r#"{"version":"1.4.0"}"#).expect("write");
    let release = dir.path().join("release").join("1.4.0");
    std::fs::create_dir_all(&release).expect("mkdir");
    std::fs::write(release.join("App-Setup-1.4.0.exe"), "installer").expect("write");
    std::fs::write(release.join("App-Setup-1.4.0.exe.blockmap"), "blockmap").expect("write");
    std::fs::write(
        release.join("latest.yml"),
        "version: 1.4.0\npath: App-Setup-1.4.0.exe\n",
    )
    .expect("write");
    dir
}

/// Environment for a valid target pointing at `project`.
pub fn target_env(project: &TempDir) -> Vec<(&'static str, OsString)> {
    vec![
        ("PUSHBOX_DEST", "deploy@updates.example.com".into()),
        ("PUSHBOX_CONTAINER", "update-server".into()),
        ("PUSHBOX_CONTAINER_PATH", "/srv/updates/".into()),
        ("PUSHBOX_PROJECT_DIR", project.path().into()),
        ("PUSHBOX_LOG_FILE", project.path().join("deploy.log").into()),
    ]
}

/// `pushbox` with a valid target pointing at `project`.
pub fn with_target(mut cmd: Command, project: &TempDir) -> Command {
    cmd.envs(target_env(project));
    cmd
}

// --- Help and version tests ---

#[test]
fn test_cli_no_args_shows_help_and_exits_two() {
    pushbox().assert().code(2).stderr(predicate::str::contains(
        "Ship an installer and its update manifest",
    ));
}

#[test]
fn test_cli_help_lists_commands() {
    pushbox()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("deploy"))
        .stdout(predicate::str::contains("check"));
}

#[test]
fn test_deploy_help_documents_env_vars() {
    pushbox()
        .args(["deploy", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("PUSHBOX_DEST"))
        .stdout(predicate::str::contains("PUSHBOX_CONTAINER_PATH"));
}

#[test]
fn test_version_command_shows_version() {
    pushbox()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "pushbox {}",
            env!("CARGO_PKG_VERSION")
        )));
}

#[test]
fn test_no_color_accepts_conventional_values() {
    for value in ["1", "yes", "true"] {
        pushbox()
            .env("NO_COLOR", value)
            .arg("version")
            .assert()
            .success()
            .stdout(predicate::str::contains("pushbox "));
    }
    pushbox()
        .env("NO_COLOR", "0")
        .arg("version")
        .assert()
        .success();
}

#[test]
fn test_version_command_json_outputs_valid_json() {
    let output = pushbox()
        .args(["version", "--json"])
        .output()
        .expect("runs");
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(value["version"], env!("CARGO_PKG_VERSION"));
}

// --- Settings validation ---

#[test]
fn test_check_without_destination_fails() {
    pushbox()
        .arg("check")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("PUSHBOX_DEST is required"));
}

#[test]
fn test_check_rejects_invalid_port() {
    let project = release_project();
    with_target(pushbox(), &project)
        .env("PUSHBOX_PORT", "22x")
        .arg("check")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid port '22x'"));
}

#[test]
fn test_check_rejects_reserved_ssh_option() {
    let project = release_project();
    with_target(pushbox(), &project)
        .env("PUSHBOX_SSH_OPTIONS", "ConnectTimeout=5 ControlPath=/tmp/x")
        .arg("check")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("managed by pushbox"));
}

#[test]
fn test_check_rejects_relative_container_path() {
    let project = release_project();
    with_target(pushbox(), &project)
        .args(["check", "--container-path", "srv/updates"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid container path"));
}

#[test]
fn test_check_rejects_missing_identity_file() {
    let project = release_project();
    with_target(pushbox(), &project)
        .env("PUSHBOX_KEY", project.path().join("no_such_key"))
        .arg("check")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Identity file not found"));
}

// --- check ---

#[test]
fn test_check_reports_plan() {
    let project = release_project();
    with_target(pushbox(), &project)
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("App-Setup-1.4.0.exe"))
        .stdout(predicate::str::contains("/srv/updates"))
        .stdout(predicate::str::contains("Ready to deploy"));
}

#[test]
fn test_check_no_multiplex_env_accepts_one() {
    let project = release_project();
    let output = with_target(pushbox(), &project)
        .env("PUSHBOX_NO_MULTIPLEX", "1")
        .args(["check", "--json"])
        .output()
        .expect("runs");
    assert!(output.status.success(), "{output:?}");
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(value["multiplex"], false);
}

#[test]
fn test_verbose_logs_are_plain_text_when_not_a_terminal() {
    let project = release_project();
    with_target(pushbox(), &project)
        .env_remove("NO_COLOR")
        .env_remove("RUST_LOG")
        .args(["-vv", "check"])
        .assert()
        .success()
        .stderr(predicate::str::contains("scanning release directory"))
        .stderr(predicate::str::contains("\u{1b}[").not());
}

#[test]
fn test_check_json_outputs_plan() {
    let project = release_project();
    let output = with_target(pushbox(), &project)
        .args(["check", "--json"])
        .output()
        .expect("runs");
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(value["version"], "1.4.0");
    assert_eq!(value["container_path"], "/srv/updates");
    assert_eq!(value["checksum"], "unavailable");
    assert!(value["blockmap"].as_str().is_some());
}

#[test]
fn test_check_json_error_object() {
    let output = pushbox()
        .args(["check", "--json"])
        .output()
        .expect("runs");
    assert_eq!(output.status.code(), Some(1));
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(value["error"], true);
    assert_eq!(value["code"], 1);
}
