//! `SshSession` command-line construction and teardown.

#![allow(clippy::expect_used)]

use std::path::Path;
use std::time::Duration;

use pushbox::application::services::session::SshSession;
use pushbox::domain::config::DeployConfig;

use crate::mocks::{ScriptedRunner, config, control_path, raw_config};

fn config_with_key_and_options() -> DeployConfig {
    let mut raw = raw_config();
    raw.port = Some("2222".to_string());
    raw.key = Some("/keys/deploy_ed25519".to_string());
    raw.ssh_options = vec!["StrictHostKeyChecking=accept-new ConnectTimeout=10".to_string()];
    DeployConfig::validate(raw, None).expect("valid config")
}

#[tokio::test]
async fn ssh_args_carry_port_identity_and_options() {
    let runner = ScriptedRunner::happy();
    let cfg = config_with_key_and_options();
    let session = SshSession::new(&runner, &cfg, None);

    session
        .run_command("true", Duration::from_secs(5))
        .await
        .expect("runs");

    let calls = runner.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].program, "ssh");
    assert_eq!(
        calls[0].args,
        vec![
            "-p",
            "2222",
            "-i",
            "/keys/deploy_ed25519",
            "-o",
            "IdentitiesOnly=yes",
            "-o",
            "StrictHostKeyChecking=accept-new",
            "-o",
            "ConnectTimeout=10",
            "deploy@updates.example.com",
            "true",
        ]
    );
}

#[tokio::test]
async fn upload_uses_capital_p_and_remote_dir_target() {
    let runner = ScriptedRunner::happy();
    let cfg = config_with_key_and_options();
    let session = SshSession::new(&runner, &cfg, None);

    let files = [Path::new("/rel/App Setup 1.4.0.exe"), Path::new("/rel/latest.yml")];
    session
        .upload(&files, "/tmp/pushbox.AbC123")
        .await
        .expect("uploads");

    let call = &runner.calls()[0];
    assert_eq!(call.program, "scp");
    assert_eq!(&call.args[..2], ["-P", "2222"]);
    assert!(call.has_arg("-q"));
    let tail: Vec<&str> = call.args.iter().rev().take(3).map(String::as_str).collect();
    assert_eq!(
        tail,
        vec![
            "deploy@updates.example.com:/tmp/pushbox.AbC123/",
            "/rel/latest.yml",
            "/rel/App Setup 1.4.0.exe",
        ]
    );
}

#[tokio::test]
async fn run_script_feeds_stdin_to_remote_shell() {
    let runner = ScriptedRunner::happy();
    let cfg = config(false);
    let session = SshSession::new(&runner, &cfg, None);

    session.run_script("echo hi\n").await.expect("runs");

    let call = &runner.calls()[0];
    assert_eq!(call.args.last().map(String::as_str), Some("sh -s"));
    assert_eq!(call.stdin.as_deref(), Some("echo hi\n"));
}

#[tokio::test]
async fn multiplexed_session_passes_control_path_everywhere() {
    let runner = ScriptedRunner::happy();
    let cfg = config(true);
    let session = SshSession::new(&runner, &cfg, control_path());
    assert!(session.is_multiplexed());

    session.open().await.expect("opens");
    session.run_script("true\n").await.expect("runs");
    session
        .upload(&[Path::new("/rel/latest.yml")], "/tmp/pushbox.AbC123")
        .await
        .expect("uploads");

    for call in runner.calls() {
        assert!(
            call.has_arg("ControlPath=/tmp/pushbox-test/cm.sock"),
            "missing ControlPath in {:?}",
            call.args
        );
    }
    let open = &runner.calls()[0];
    assert!(open.is_master_start());
    assert!(open.has_arg("ControlPersist=yes"));
    assert!(open.has_arg("-f") && open.has_arg("-N"));
}

#[tokio::test]
async fn close_tears_down_exactly_once() {
    let runner = ScriptedRunner::happy();
    let cfg = config(true);
    let session = SshSession::new(&runner, &cfg, control_path());

    session.open().await.expect("opens");
    assert!(session.close().await);
    assert!(!session.close().await);
    assert_eq!(runner.count(|c| c.is_master_exit()), 1);
}

#[tokio::test]
async fn close_without_open_runs_nothing() {
    let runner = ScriptedRunner::happy();
    let cfg = config(true);
    let session = SshSession::new(&runner, &cfg, control_path());

    assert!(session.close().await);
    assert!(!session.close().await);
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn open_is_a_no_op_without_control_path() {
    let runner = ScriptedRunner::happy();
    let cfg = config(false);
    let session = SshSession::new(&runner, &cfg, None);

    session.open().await.expect("no-op");
    assert!(session.close().await);
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn ipv6_destination_is_unbracketed_for_ssh_only() {
    let runner = ScriptedRunner::happy();
    let mut raw = raw_config();
    raw.destination = Some("root@[2001:db8::1]".to_string());
    let cfg = DeployConfig::validate(raw, None).expect("valid config");
    let session = SshSession::new(&runner, &cfg, None);

    session
        .run_command("true", Duration::from_secs(5))
        .await
        .expect("runs");
    session
        .upload(&[Path::new("/rel/latest.yml")], "/tmp/pushbox.AbC123")
        .await
        .expect("uploads");

    let calls = runner.calls();
    assert!(calls[0].has_arg("root@2001:db8::1"));
    assert!(calls[1].has_arg("root@[2001:db8::1]:/tmp/pushbox.AbC123/"));
}
