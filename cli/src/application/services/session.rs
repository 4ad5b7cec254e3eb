//! Application service — SSH transport session.
//!
//! Wraps the `ssh`/`scp` command lines for one destination. When a control
//! socket path is supplied the session opens an OpenSSH control master so
//! every later invocation reuses one authenticated connection; [`close`]
//! tears it down and is safe to call more than once.
//!
//! [`close`]: SshSession::close

use std::path::{Path, PathBuf};
use std::process::Output;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};

use crate::application::ports::CommandRunner;
use crate::domain::config::{DeployConfig, Destination};
use crate::domain::error::DeployError;

/// Upper bound for `ssh -O exit`.
pub const TEARDOWN_TIMEOUT: Duration = Duration::from_secs(15);

/// Upper bound for diagnostic commands after a failure.
pub const DIAGNOSTIC_TIMEOUT: Duration = Duration::from_secs(30);

/// One SSH destination plus the flags every invocation needs.
pub struct SshSession<'a, R: CommandRunner> {
    runner: &'a R,
    ssh_bin: String,
    scp_bin: String,
    destination: Destination,
    port: u16,
    identity: Option<PathBuf>,
    options: Vec<String>,
    control_path: Option<PathBuf>,
    opened: AtomicBool,
    closed: AtomicBool,
}

impl<'a, R: CommandRunner> SshSession<'a, R> {
    /// Build a session. `control_path` enables connection sharing.
    #[must_use]
    pub fn new(runner: &'a R, cfg: &DeployConfig, control_path: Option<PathBuf>) -> Self {
        Self {
            runner,
            ssh_bin: cfg.ssh_bin.clone(),
            scp_bin: cfg.scp_bin.clone(),
            destination: cfg.destination.clone(),
            port: cfg.port,
            identity: cfg.identity.clone(),
            options: cfg.ssh_options.iter().map(ToString::to_string).collect(),
            control_path,
            opened: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    /// Whether a control master is (or will be) used.
    #[must_use]
    pub fn is_multiplexed(&self) -> bool {
        self.control_path.is_some()
    }

    #[must_use]
    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    /// Flags shared by `ssh` and `scp`. They differ only in the port flag.
    fn base_args(&self, port_flag: &str) -> Vec<String> {
        let mut args = vec![port_flag.to_string(), self.port.to_string()];
        if let Some(key) = &self.identity {
            args.push("-i".to_string());
            args.push(key.display().to_string());
            args.push("-o".to_string());
            args.push("IdentitiesOnly=yes".to_string());
        }
        for opt in &self.options {
            args.push("-o".to_string());
            args.push(opt.clone());
        }
        if let Some(path) = &self.control_path {
            args.push("-o".to_string());
            args.push(format!("ControlPath={}", path.display()));
        }
        args
    }

    fn ssh_args(&self, tail: &[&str]) -> Vec<String> {
        let mut args = self.base_args("-p");
        args.extend(tail.iter().map(ToString::to_string));
        args
    }

    /// Start the control master, if this session is multiplexed.
    ///
    /// Runs with the terminal attached so passphrase or host-key prompts
    /// work; `-f` returns once authentication is complete.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::ConnectFailed` if `ssh` exits non-zero.
    pub async fn open(&self) -> Result<()> {
        if self.control_path.is_none() {
            return Ok(());
        }
        self.opened.store(true, Ordering::SeqCst);
        let dest = self.destination.ssh_arg();
        let args = self.ssh_args(&[
            "-o",
            "ControlMaster=yes",
            "-o",
            "ControlPersist=yes",
            "-f",
            "-N",
            &dest,
        ]);
        tracing::debug!(program = %self.ssh_bin, ?args, "opening control master");
        let status = self
            .runner
            .run_status(&self.ssh_bin, &as_strs(&args))
            .await
            .with_context(|| format!("starting {}", self.ssh_bin))?;
        if !status.success() {
            return Err(DeployError::ConnectFailed {
                destination: self.destination.to_string(),
                code: status.code().unwrap_or(-1),
            }
            .into());
        }
        tracing::info!(destination = %self.destination, "control master up");
        Ok(())
    }

    /// Feed `script` to `sh -s` on the remote host.
    ///
    /// # Errors
    ///
    /// Returns an error if `ssh` cannot be spawned or times out.
    pub async fn run_script(&self, script: &str) -> Result<Output> {
        let dest = self.destination.ssh_arg();
        let args = self.ssh_args(&[&dest, "sh -s"]);
        tracing::debug!(program = %self.ssh_bin, ?args, "running remote script");
        self.runner
            .run_with_stdin(&self.ssh_bin, &as_strs(&args), script.as_bytes())
            .await
            .with_context(|| format!("running remote script via {}", self.ssh_bin))
    }

    /// Run a single remote command line.
    ///
    /// # Errors
    ///
    /// Returns an error if `ssh` cannot be spawned or exceeds `timeout`.
    pub async fn run_command(&self, command: &str, timeout: Duration) -> Result<Output> {
        let dest = self.destination.ssh_arg();
        let args = self.ssh_args(&[&dest, command]);
        tracing::debug!(program = %self.ssh_bin, ?args, "running remote command");
        self.runner
            .run_with_timeout(&self.ssh_bin, &as_strs(&args), timeout)
            .await
            .with_context(|| format!("running remote command via {}", self.ssh_bin))
    }

    /// Copy local files into `remote_dir` with `scp`.
    ///
    /// # Errors
    ///
    /// Returns an error if `scp` cannot be spawned or times out.
    pub async fn upload(&self, files: &[&Path], remote_dir: &str) -> Result<Output> {
        let mut args = self.base_args("-P");
        args.push("-q".to_string());
        args.extend(files.iter().map(|f| f.display().to_string()));
        args.push(self.destination.scp_target(&format!("{remote_dir}/")));
        tracing::debug!(program = %self.scp_bin, ?args, "uploading");
        self.runner
            .run(&self.scp_bin, &as_strs(&args))
            .await
            .with_context(|| format!("uploading via {}", self.scp_bin))
    }

    /// Stop the control master. Returns `true` only for the call that
    /// actually performed teardown; later calls are no-ops.
    ///
    /// Failures are logged, not returned.
    pub async fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }
        if !self.opened.load(Ordering::SeqCst) {
            return true;
        }
        let dest = self.destination.ssh_arg();
        let args = self.ssh_args(&["-O", "exit", &dest]);
        tracing::debug!(program = %self.ssh_bin, ?args, "closing control master");
        match self
            .runner
            .run_with_timeout(&self.ssh_bin, &as_strs(&args), TEARDOWN_TIMEOUT)
            .await
        {
            Ok(out) if out.status.success() => {
                tracing::info!(destination = %self.destination, "control master closed");
            }
            Ok(out) => tracing::warn!(
                code = ?out.status.code(),
                stderr = %String::from_utf8_lossy(&out.stderr).trim(),
                "control master exit request failed"
            ),
            Err(e) => tracing::warn!(error = %e, "control master exit request failed"),
        }
        true
    }
}

fn as_strs(args: &[String]) -> Vec<&str> {
    args.iter().map(String::as_str).collect()
}
