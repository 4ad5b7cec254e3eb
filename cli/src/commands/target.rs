//! Target and release settings shared by `deploy` and `check`.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use clap::builder::FalseyValueParser;

use crate::domain::config::{DEFAULT_LOG_FILE, DEFAULT_TIMEOUT_SECS, DeployConfig, RawConfig};
use crate::domain::error::ConfigError;

/// Where to deploy and what to deploy. Every flag can also be set through
/// the environment variable shown in `--help`.
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// SSH destination, [user@]host
    #[arg(long, env = "PUSHBOX_DEST", value_name = "USER@HOST")]
    pub dest: Option<String>,

    /// SSH port (1-65535) [default: 22]
    #[arg(long, env = "PUSHBOX_PORT")]
    pub port: Option<String>,

    /// SSH identity file
    #[arg(long, env = "PUSHBOX_KEY", value_name = "PATH")]
    pub key: Option<String>,

    /// Extra ssh/scp option as Key=Value (repeatable; env var is space separated)
    #[arg(long = "ssh-option", env = "PUSHBOX_SSH_OPTIONS", value_name = "KEY=VALUE")]
    pub ssh_options: Vec<String>,

    /// Name of the running container to update
    #[arg(long, env = "PUSHBOX_CONTAINER")]
    pub container: Option<String>,

    /// Absolute directory inside the container that serves the release
    #[arg(long, env = "PUSHBOX_CONTAINER_PATH", value_name = "PATH")]
    pub container_path: Option<String>,

    /// Container runtime on the remote host: docker, podman
    #[arg(long, env = "PUSHBOX_RUNTIME", default_value = "docker")]
    pub runtime: String,

    /// Release platform: win, mac, linux
    #[arg(long, env = "PUSHBOX_PLATFORM", default_value = "win")]
    pub platform: String,

    /// Open a fresh SSH connection for each step instead of sharing one
    #[arg(long, env = "PUSHBOX_NO_MULTIPLEX", value_parser = FalseyValueParser::new())]
    pub no_multiplex: bool,

    /// Project directory containing package.json
    #[arg(long, env = "PUSHBOX_PROJECT_DIR", default_value = ".")]
    pub project_dir: PathBuf,

    /// Release directory [default: <project-dir>/release/<version>]
    #[arg(long, env = "PUSHBOX_RELEASE_DIR")]
    pub release_dir: Option<PathBuf>,

    /// Local file receiving the install step's output
    #[arg(long, env = "PUSHBOX_LOG_FILE", default_value = DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,

    /// ssh client program
    #[arg(long, env = "PUSHBOX_SSH_BIN", default_value = "ssh")]
    pub ssh_bin: String,

    /// scp client program
    #[arg(long, env = "PUSHBOX_SCP_BIN", default_value = "scp")]
    pub scp_bin: String,

    /// Per-step timeout in seconds
    #[arg(long, env = "PUSHBOX_TIMEOUT", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Do not compare the installer against the manifest's sha512
    #[arg(long)]
    pub skip_verify: bool,
}

impl TargetArgs {
    #[must_use]
    pub fn to_raw(&self) -> RawConfig {
        RawConfig {
            destination: self.dest.clone(),
            port: self.port.clone(),
            key: self.key.clone(),
            ssh_options: self.ssh_options.clone(),
            container: self.container.clone(),
            container_path: self.container_path.clone(),
            runtime: self.runtime.clone(),
            platform: self.platform.clone(),
            multiplex: !self.no_multiplex && cfg!(unix),
            project_dir: self.project_dir.clone(),
            release_dir: self.release_dir.clone(),
            log_file: self.log_file.clone(),
            ssh_bin: self.ssh_bin.clone(),
            scp_bin: self.scp_bin.clone(),
            timeout_secs: self.timeout,
            skip_verify: self.skip_verify,
        }
    }

    /// Validate the settings and check the identity file exists.
    ///
    /// # Errors
    ///
    /// Returns the first `ConfigError` found.
    pub fn load(&self) -> Result<DeployConfig> {
        let home = dirs::home_dir();
        let cfg = DeployConfig::validate(self.to_raw(), home.as_deref())?;
        if let Some(key) = cfg.identity.as_ref().filter(|k| !k.is_file()) {
            return Err(ConfigError::IdentityNotFound(key.clone()).into());
        }
        tracing::debug!(destination = %cfg.destination, port = cfg.port, "configuration valid");
        Ok(cfg)
    }
}
