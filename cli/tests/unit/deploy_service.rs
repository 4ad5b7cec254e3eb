//! The three-step remote procedure against a scripted host.

#![allow(clippy::expect_used)]

use std::future::Future;
use std::time::Duration;

use pushbox::application::services::deploy::{DeployOutcome, deploy};
use pushbox::application::services::session::SshSession;
use pushbox::commands::exit_code;
use pushbox::domain::error::{DeployError, Interrupt};

use crate::mocks::{
    Call, RecordingLog, RecordingReporter, Reply, ScriptedRunner, artifacts, config, control_path,
    err_output, happy_reply, ok_output, REMOTE_TMP,
};

/// A shutdown future that never fires.
fn never() -> impl Future<Output = Interrupt> {
    std::future::pending()
}

async fn run(
    runner: &ScriptedRunner,
    multiplex: bool,
    reporter: &RecordingReporter,
    log: &RecordingLog,
    shutdown: impl Future<Output = Interrupt>,
) -> anyhow::Result<DeployOutcome> {
    let cfg = config(multiplex);
    let session = SshSession::new(runner, &cfg, multiplex.then(control_path).flatten());
    let result = deploy(&session, &cfg, &artifacts(), log, reporter, shutdown).await;
    assert!(!session.close().await, "deploy must already have closed the session");
    result
}

#[tokio::test]
async fn successful_deploy_runs_steps_in_order() {
    let runner = ScriptedRunner::happy();
    let reporter = RecordingReporter::default();
    let log = RecordingLog::default();

    let outcome = run(&runner, true, &reporter, &log, never())
        .await
        .expect("deploys");

    let calls = runner.calls();
    let kinds: Vec<&str> = calls
        .iter()
        .map(|c| {
            if c.is_master_start() {
                "open"
            } else if c.is_prepare() {
                "prepare"
            } else if c.program == "scp" {
                "transfer"
            } else if c.is_install() {
                "install"
            } else if c.is_master_exit() {
                "close"
            } else {
                "other"
            }
        })
        .collect();
    assert_eq!(kinds, ["open", "prepare", "transfer", "install", "close"]);

    assert_eq!(outcome.remote_tmp, REMOTE_TMP);
    assert_eq!(
        outcome.installed,
        ["App Setup 1.4.0.exe", "App Setup 1.4.0.exe.blockmap", "latest.yml"]
    );
    assert_eq!(log.entries().len(), 1);
    assert_eq!(log.entries()[0].0, REMOTE_TMP);
    assert_eq!(log.entries()[0].1, Some(0));
}

#[tokio::test]
async fn manifest_is_uploaded_and_installed_last() {
    let runner = ScriptedRunner::happy();
    let reporter = RecordingReporter::default();
    let log = RecordingLog::default();

    run(&runner, true, &reporter, &log, never())
        .await
        .expect("deploys");

    let calls = runner.calls();
    let scp = calls.iter().find(|c| c.program == "scp").expect("scp call");
    let n = scp.args.len();
    assert!(scp.args[n - 2].ends_with("latest.yml"));
    assert_eq!(scp.args[n - 1], format!("deploy@updates.example.com:{REMOTE_TMP}/"));

    let script = calls
        .iter()
        .find(|c| c.is_install())
        .and_then(|c| c.stdin.clone())
        .expect("install script");
    let installer = script.find("'/srv/updates/App Setup 1.4.0.exe'").expect("installer");
    let manifest = script.find("/srv/updates/latest.yml").expect("manifest");
    assert!(installer < manifest);
    assert!(script.contains(&format!("T={REMOTE_TMP}")));
}

#[tokio::test]
async fn install_failure_keeps_staging_and_tears_down_once() {
    let runner = ScriptedRunner::new(|call: &Call| {
        if call.is_install() {
            Reply::Out(err_output(125, b"Error: No such container: update-server\n"))
        } else {
            happy_reply(call)
        }
    });
    let reporter = RecordingReporter::default();
    let log = RecordingLog::default();

    let err = run(&runner, true, &reporter, &log, never())
        .await
        .expect_err("install fails");

    match err.downcast_ref::<DeployError>() {
        Some(DeployError::StepFailed { step, code, detail }) => {
            assert_eq!(*step, "install");
            assert_eq!(*code, 125);
            assert!(detail.contains("No such container"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(exit_code(&err), 1);
    assert_eq!(runner.count(Call::is_master_exit), 1);
    assert_eq!(runner.count(Call::is_tail), 1);
    assert_eq!(log.entries()[0].1, Some(125));

    let events = reporter.events();
    assert!(events.iter().any(|e| e.contains("kept for inspection")));
    assert!(events.contains(&"detail: cp: no space left on device".to_string()));
}

#[tokio::test]
async fn transfer_failure_stops_before_install() {
    let runner = ScriptedRunner::new(|call: &Call| {
        if call.program == "scp" {
            Reply::Out(err_output(1, b"scp: /tmp/pushbox.AbC123/: Permission denied\n"))
        } else {
            happy_reply(call)
        }
    });
    let reporter = RecordingReporter::default();
    let log = RecordingLog::default();

    let err = run(&runner, true, &reporter, &log, never())
        .await
        .expect_err("transfer fails");

    assert!(err.to_string().contains("'transfer'"), "got: {err}");
    assert_eq!(runner.count(Call::is_install), 0);
    assert_eq!(runner.count(Call::is_master_exit), 1);
    assert!(log.entries().is_empty());
}

#[tokio::test]
async fn prepare_failure_reports_remote_reason() {
    let runner = ScriptedRunner::new(|call: &Call| {
        if call.is_prepare() {
            Reply::Out(err_output(3, b"pushbox: container update-server is not running\n"))
        } else {
            happy_reply(call)
        }
    });
    let reporter = RecordingReporter::default();
    let log = RecordingLog::default();

    let err = run(&runner, false, &reporter, &log, never())
        .await
        .expect_err("prepare fails");

    assert!(err.to_string().contains("is not running"), "got: {err}");
    assert_eq!(runner.count(|c| c.program == "scp"), 0);
}

#[tokio::test]
async fn unusable_temp_dir_is_rejected() {
    let runner = ScriptedRunner::new(|call: &Call| {
        if call.is_prepare() {
            Reply::Out(ok_output(b"/home/deploy\n"))
        } else {
            happy_reply(call)
        }
    });
    let reporter = RecordingReporter::default();
    let log = RecordingLog::default();

    let err = run(&runner, true, &reporter, &log, never())
        .await
        .expect_err("bad temp dir");

    assert!(matches!(
        err.downcast_ref::<DeployError>(),
        Some(DeployError::BadRemoteTempDir(_))
    ));
    assert_eq!(runner.count(|c| c.program == "scp"), 0);
    assert_eq!(runner.count(Call::is_master_exit), 1);
}

#[tokio::test]
async fn connect_failure_is_reported() {
    let runner = ScriptedRunner::new(|call: &Call| {
        if call.is_master_start() {
            Reply::Out(err_output(255, b""))
        } else {
            happy_reply(call)
        }
    });
    let reporter = RecordingReporter::default();
    let log = RecordingLog::default();

    let err = run(&runner, true, &reporter, &log, never())
        .await
        .expect_err("connect fails");

    assert!(matches!(
        err.downcast_ref::<DeployError>(),
        Some(DeployError::ConnectFailed { code: 255, .. })
    ));
    assert_eq!(runner.count(Call::is_prepare), 0);
    assert_eq!(runner.count(Call::is_master_exit), 1);
}

#[tokio::test]
async fn without_multiplexing_no_control_master_is_used() {
    let runner = ScriptedRunner::happy();
    let reporter = RecordingReporter::default();
    let log = RecordingLog::default();

    run(&runner, false, &reporter, &log, never())
        .await
        .expect("deploys");

    assert_eq!(runner.count(Call::is_master_start), 0);
    assert_eq!(runner.count(Call::is_master_exit), 0);
    assert!(
        runner
            .calls()
            .iter()
            .all(|c| !c.args.iter().any(|a| a.starts_with("ControlPath=")))
    );
}

#[tokio::test]
async fn signal_during_transfer_interrupts_and_tears_down_once() {
    let runner = ScriptedRunner::new(|call: &Call| {
        if call.program == "scp" {
            Reply::Hang
        } else {
            happy_reply(call)
        }
    });
    let reporter = RecordingReporter::default();
    let log = RecordingLog::default();
    let shutdown = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        Interrupt::Terminate
    };

    let err = run(&runner, true, &reporter, &log, shutdown)
        .await
        .expect_err("interrupted");

    assert!(matches!(
        err.downcast_ref::<DeployError>(),
        Some(DeployError::Interrupted {
            signal: Interrupt::Terminate
        })
    ));
    assert_eq!(exit_code(&err), 143);
    assert_eq!(runner.count(Call::is_master_exit), 1);
    assert_eq!(runner.count(Call::is_install), 0);
}

#[tokio::test]
async fn signal_before_start_runs_nothing_remote() {
    let runner = ScriptedRunner::happy();
    let reporter = RecordingReporter::default();
    let log = RecordingLog::default();

    let err = run(
        &runner,
        true,
        &reporter,
        &log,
        std::future::ready(Interrupt::Interrupt),
    )
    .await
    .expect_err("interrupted");

    assert_eq!(exit_code(&err), 130);
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn log_write_failure_after_success_is_only_a_warning() {
    let runner = ScriptedRunner::happy();
    let reporter = RecordingReporter::default();
    let log = RecordingLog::failing();

    let outcome = run(&runner, true, &reporter, &log, never())
        .await
        .expect("deploy still succeeds");

    assert_eq!(outcome.log_file, None);
    assert_eq!(outcome.installed.len(), 3);
    let events = reporter.events();
    assert!(events.iter().any(|e| e.starts_with("warn: Local deploy log not written")));
    assert!(events.iter().any(|e| e.starts_with("success: Deployed 3 files")));
}

#[tokio::test]
async fn log_write_failure_after_failed_install_keeps_step_error() {
    let runner = ScriptedRunner::new(|call: &Call| {
        if call.is_install() {
            Reply::Out(err_output(1, b"mv: cannot move\n"))
        } else {
            happy_reply(call)
        }
    });
    let reporter = RecordingReporter::default();
    let log = RecordingLog::failing();

    let err = run(&runner, true, &reporter, &log, never())
        .await
        .expect_err("install fails");

    assert!(matches!(
        err.downcast_ref::<DeployError>(),
        Some(DeployError::StepFailed { step: "install", .. })
    ));
    assert_eq!(runner.count(Call::is_tail), 1);
    let events = reporter.events();
    assert!(events.iter().any(|e| e.contains("Local deploy log not written")));
    assert!(events.iter().any(|e| e.contains("kept for inspection")));
    assert_eq!(runner.count(Call::is_master_exit), 1);
}

#[tokio::test]
async fn signal_after_prepare_reports_remote_staging_dir() {
    let runner = ScriptedRunner::new(|call: &Call| {
        if call.program == "scp" {
            Reply::Hang
        } else {
            happy_reply(call)
        }
    });
    let reporter = RecordingReporter::default();
    let log = RecordingLog::default();
    let shutdown = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        Interrupt::Interrupt
    };

    let err = run(&runner, true, &reporter, &log, shutdown)
        .await
        .expect_err("interrupted");

    assert_eq!(err.to_string(), "Deployment interrupted by SIGINT");
    assert!(
        reporter
            .events()
            .contains(&format!("warn: Remote staging directory may remain: {REMOTE_TMP}"))
    );
}
