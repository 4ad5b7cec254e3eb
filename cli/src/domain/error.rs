//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors raised while validating deployment settings.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} is required but was empty or unset")]
    Missing { name: &'static str },

    #[error("Invalid port '{0}': must be a number between 1 and 65535")]
    InvalidPort(String),

    #[error("Invalid destination '{value}': {reason}")]
    InvalidDestination { value: String, reason: &'static str },

    #[error("Invalid SSH option '{token}': {reason}")]
    InvalidSshOption { token: String, reason: String },

    #[error("Invalid container name '{0}': must match [a-zA-Z0-9][a-zA-Z0-9_.-]*")]
    InvalidContainerName(String),

    #[error("Invalid container path '{value}': {reason}")]
    InvalidContainerPath { value: String, reason: &'static str },

    #[error("Unknown container runtime '{0}'. Supported: docker, podman")]
    UnknownRuntime(String),

    #[error("Unknown platform '{0}'. Supported: win, mac, linux")]
    UnknownPlatform(String),

    #[error("Invalid timeout: must be greater than zero seconds")]
    InvalidTimeout,

    #[error("Identity file not found: {0}")]
    IdentityNotFound(PathBuf),
}

// ── Artifact errors ───────────────────────────────────────────────────────────

/// Errors raised while locating release artifacts.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Version descriptor not found: {0}")]
    DescriptorNotFound(PathBuf),

    #[error("No \"version\" field in {0}")]
    MissingVersion(PathBuf),

    #[error("Invalid version '{version}' in {path}: {reason}")]
    InvalidVersion {
        version: String,
        path: PathBuf,
        reason: String,
    },

    #[error("Release directory not found: {0}\n\nBuild the release first, or pass --release-dir.")]
    ReleaseDirNotFound(PathBuf),

    #[error("No update manifest (latest*.yml) found in {0}")]
    ManifestNotFound(PathBuf),

    #[error(
        "{manifest} references {file}, which is not in {dir}\n\n\
         Rebuild the release so the manifest and installer match."
    )]
    ManifestInstallerMissing {
        manifest: String,
        file: String,
        dir: PathBuf,
    },

    #[error("No installer found in {dir} for version {version}")]
    InstallerNotFound { dir: PathBuf, version: String },

    #[error(
        "Checksum mismatch for {file}: manifest says {expected}, file is {actual}\n\n\
         Rebuild the release or pass --skip-verify."
    )]
    ChecksumMismatch {
        file: String,
        expected: String,
        actual: String,
    },
}

// ── Deploy errors ─────────────────────────────────────────────────────────────

/// Signal that stopped a deployment before it finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// SIGINT (Ctrl-C).
    Interrupt,
    /// SIGTERM.
    Terminate,
}

impl fmt::Display for Interrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Interrupt => "SIGINT",
            Self::Terminate => "SIGTERM",
        })
    }
}

impl Interrupt {
    /// Conventional shell exit code for the signal (128 + signo).
    #[must_use]
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Interrupt => 130,
            Self::Terminate => 143,
        }
    }
}

/// Errors raised by the remote procedure.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("Could not open SSH connection to {destination} (exit code {code})")]
    ConnectFailed { destination: String, code: i32 },

    #[error("Remote step '{step}' failed (exit code {code}){detail}")]
    StepFailed {
        step: &'static str,
        code: i32,
        detail: String,
    },

    #[error("Remote host returned an unusable temp directory: {0:?}")]
    BadRemoteTempDir(String),

    #[error("Deployment interrupted by {signal}")]
    Interrupted { signal: Interrupt },
}
