//! Application service — the three-step remote procedure.
//!
//! Imports only from `crate::domain` and `crate::application`.
//! All I/O is routed through injected port traits.

use std::cell::RefCell;
use std::future::Future;
use std::path::PathBuf;
use std::process::Output;

use anyhow::Result;

use crate::application::ports::{CommandRunner, DeployLog, LogEntry, ProgressReporter};
use crate::application::services::session::{DIAGNOSTIC_TIMEOUT, SshSession};
use crate::domain::artifact::{self, ReleaseArtifacts};
use crate::domain::config::DeployConfig;
use crate::domain::error::{DeployError, Interrupt};
use crate::domain::shell;

/// Result of a successful deployment.
#[derive(Debug, Clone)]
pub struct DeployOutcome {
    /// Remote temp dir used for staging (already removed).
    pub remote_tmp: String,
    /// Local file holding the install step's output, if it could be written.
    pub log_file: Option<PathBuf>,
    /// Installed file names, in install order.
    pub installed: Vec<String>,
}

/// Run the remote procedure, racing it against `shutdown`.
///
/// The session is closed exactly once after the race, whether the steps
/// succeeded, failed, or were interrupted.
///
/// # Errors
///
/// Returns `DeployError::Interrupted` if `shutdown` resolves first, or the
/// first failing step's error.
pub async fn deploy<R, L, P, S>(
    session: &SshSession<'_, R>,
    cfg: &DeployConfig,
    artifacts: &ReleaseArtifacts,
    log: &L,
    reporter: &P,
    shutdown: S,
) -> Result<DeployOutcome>
where
    R: CommandRunner,
    L: DeployLog,
    P: ProgressReporter,
    S: Future<Output = Interrupt>,
{
    // Remote temp dir that still exists, if any.
    let staging = RefCell::new(None);
    let result = tokio::select! {
        biased;
        signal = shutdown => {
            tracing::warn!(%signal, "interrupted");
            if let Some(tmp) = staging.borrow().as_deref() {
                reporter.warn(&format!("Remote staging directory may remain: {tmp}"));
            }
            Err(DeployError::Interrupted { signal }.into())
        }
        result = run_steps(session, cfg, artifacts, log, reporter, &staging) => result,
    };
    session.close().await;
    result
}

async fn run_steps<R, L, P>(
    session: &SshSession<'_, R>,
    cfg: &DeployConfig,
    artifacts: &ReleaseArtifacts,
    log: &L,
    reporter: &P,
    staging: &RefCell<Option<String>>,
) -> Result<DeployOutcome>
where
    R: CommandRunner,
    L: DeployLog,
    P: ProgressReporter,
{
    let destination = session.destination().to_string();

    if session.is_multiplexed() {
        reporter.step(&format!("Connecting to {destination}..."));
        session.open().await?;
    }

    // 1. Prepare
    reporter.step("Preparing remote staging directory...");
    tracing::info!(step = "prepare", "starting");
    let out = session
        .run_script(&shell::prepare_script(cfg.runtime, &cfg.container))
        .await?;
    if !out.status.success() {
        return Err(step_failed("prepare", &out).into());
    }
    let stdout = String::from_utf8_lossy(&out.stdout);
    let tmp = shell::parse_remote_tmp_dir(&stdout)
        .ok_or_else(|| DeployError::BadRemoteTempDir(stdout.trim().to_string()))?;
    tracing::info!(step = "prepare", remote_tmp = %tmp, "done");
    staging.replace(Some(tmp.clone()));

    // 2. Transfer
    let files = artifacts.install_order();
    reporter.step(&format!("Uploading {} files to {destination}:{tmp}...", files.len()));
    tracing::info!(step = "transfer", files = files.len(), "starting");
    match session.upload(&files, &tmp).await {
        Ok(out) if out.status.success() => {}
        Ok(out) => {
            print_remote_log_tail(session, &tmp, reporter).await;
            return Err(step_failed("transfer", &out).into());
        }
        Err(e) => {
            print_remote_log_tail(session, &tmp, reporter).await;
            return Err(e);
        }
    }

    // 3. Install
    let names: Vec<&str> = files.iter().filter_map(|p| artifact::file_name(p)).collect();
    reporter.step(&format!(
        "Installing into {}:{}...",
        cfg.container, cfg.container_path
    ));
    tracing::info!(step = "install", "starting");
    let script = shell::install_script(
        cfg.runtime,
        &cfg.container,
        &cfg.container_path,
        &tmp,
        &names,
    );
    let out = match session.run_script(&script).await {
        Ok(out) => out,
        Err(e) => {
            print_remote_log_tail(session, &tmp, reporter).await;
            return Err(e);
        }
    };
    let log_file = match log.record(&LogEntry {
        destination: &destination,
        container: &cfg.container,
        container_path: &cfg.container_path,
        remote_tmp: &tmp,
        output: &out,
    }) {
        Ok(path) => Some(path),
        Err(e) => {
            tracing::warn!(error = %e, "cannot write local deploy log");
            reporter.warn(&format!("Local deploy log not written: {e:#}"));
            None
        }
    };
    if !out.status.success() {
        print_remote_log_tail(session, &tmp, reporter).await;
        reporter.warn(&format!("Remote staging directory kept for inspection: {tmp}"));
        return Err(step_failed("install", &out).into());
    }
    staging.replace(None);
    tracing::info!(step = "install", log = ?log_file, "done");
    reporter.success(&format!(
        "Deployed {} files to {}:{}",
        names.len(),
        cfg.container,
        cfg.container_path
    ));

    Ok(DeployOutcome {
        remote_tmp: tmp,
        log_file,
        installed: names.into_iter().map(str::to_string).collect(),
    })
}

/// Best-effort: show the end of the remote install log. Never fails.
async fn print_remote_log_tail<R, P>(session: &SshSession<'_, R>, tmp: &str, reporter: &P)
where
    R: CommandRunner,
    P: ProgressReporter,
{
    let out = match session
        .run_command(&shell::tail_log_command(tmp), DIAGNOSTIC_TIMEOUT)
        .await
    {
        Ok(out) => out,
        Err(e) => {
            tracing::debug!(error = %e, "could not fetch remote log");
            return;
        }
    };
    let text = String::from_utf8_lossy(&out.stdout);
    if text.trim().is_empty() {
        return;
    }
    reporter.warn(&format!("Remote log ({tmp}/{}):", shell::REMOTE_LOG_NAME));
    for line in text.lines() {
        reporter.detail(line);
    }
}

fn step_failed(step: &'static str, out: &Output) -> DeployError {
    let stderr = String::from_utf8_lossy(&out.stderr);
    let detail = stderr
        .lines()
        .map(str::trim)
        .rfind(|l| !l.is_empty())
        .map(|l| format!(": {l}"))
        .unwrap_or_default();
    DeployError::StepFailed {
        step,
        code: out.status.code().unwrap_or(-1),
        detail,
    }
}
