//! JSON output for `--json`.
//!
//! `check` prints a [`PlanReport`], `deploy` a [`DeployReport`], and any
//! failure the error object from [`format_error`].

use anyhow::{Context, Result};
use serde::Serialize;

use crate::application::services::deploy::DeployOutcome;
use crate::application::services::discover::Discovery;
use crate::domain::artifact::ChecksumStatus;
use crate::domain::config::DeployConfig;

/// What would be deployed, and where.
#[derive(Debug, Serialize)]
pub struct PlanReport {
    pub version: String,
    pub release_dir: String,
    pub installer: String,
    pub blockmap: Option<String>,
    pub manifest: String,
    pub checksum: ChecksumStatus,
    pub destination: String,
    pub port: u16,
    pub container: String,
    pub container_path: String,
    pub runtime: &'static str,
    pub multiplex: bool,
    pub warnings: Vec<String>,
}

impl PlanReport {
    #[must_use]
    pub fn new(cfg: &DeployConfig, discovery: &Discovery) -> Self {
        let a = &discovery.artifacts;
        Self {
            version: a.version.clone(),
            release_dir: a.release_dir.display().to_string(),
            installer: a.installer.display().to_string(),
            blockmap: a.blockmap.as_ref().map(|p| p.display().to_string()),
            manifest: a.manifest.display().to_string(),
            checksum: a.checksum,
            destination: cfg.destination.to_string(),
            port: cfg.port,
            container: cfg.container.clone(),
            container_path: cfg.container_path.clone(),
            runtime: cfg.runtime.program(),
            multiplex: cfg.multiplex,
            warnings: discovery.warnings.clone(),
        }
    }
}

/// A finished (or declined) deployment.
#[derive(Debug, Serialize)]
pub struct DeployReport {
    pub deployed: bool,
    #[serde(flatten)]
    pub plan: PlanReport,
    pub installed: Vec<String>,
    pub log_file: Option<String>,
}

impl DeployReport {
    #[must_use]
    pub fn new(plan: PlanReport, outcome: &DeployOutcome) -> Self {
        Self {
            deployed: true,
            plan,
            installed: outcome.installed.clone(),
            log_file: outcome.log_file.as_ref().map(|p| p.display().to_string()),
        }
    }

    /// The operator declined the confirmation prompt.
    #[must_use]
    pub fn cancelled(plan: PlanReport) -> Self {
        Self {
            deployed: false,
            plan,
            installed: Vec::new(),
            log_file: None,
        }
    }
}

/// Pretty-print any serializable report.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn to_pretty<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("JSON serialization failed")
}

/// Format a JSON error object.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": 1
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: i32) -> Result<String> {
    let obj = serde_json::json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}
