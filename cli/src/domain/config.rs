//! Domain types and validators for deployment settings.
//!
//! Pure functions only — no I/O, no async, no filesystem access.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::domain::error::ConfigError;

// ── Constants ────────────────────────────────────────────────────────────────

pub const DEFAULT_PORT: u16 = 22;
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_LOG_FILE: &str = "pushbox-deploy.log";

/// SSH options owned by the connection-sharing session; user overrides would
/// break teardown.
pub const RESERVED_SSH_OPTIONS: &[&str] = &["ControlMaster", "ControlPath", "ControlPersist"];

static USER_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9._-]*$").expect("valid regex")
});

static HOST_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9.-]*[A-Za-z0-9])?$").expect("valid regex")
});

static IPV6_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^\[[0-9A-Fa-f:.]+(%[A-Za-z0-9]+)?\]$").expect("valid regex")
});

static OPTION_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[A-Za-z][A-Za-z0-9]*$").expect("valid regex")
});

static OPTION_VALUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[A-Za-z0-9@%+=:,./_~-]+$").expect("valid regex")
});

static CONTAINER_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9_.-]*$").expect("valid regex")
});

// ── Value types ──────────────────────────────────────────────────────────────

/// A validated `[user@]host` SSH destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub user: Option<String>,
    pub host: String,
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.user {
            Some(user) => write!(f, "{user}@{}", self.host),
            None => f.write_str(&self.host),
        }
    }
}

impl Destination {
    /// Form accepted by `ssh`: IPv6 brackets removed.
    #[must_use]
    pub fn ssh_arg(&self) -> String {
        let host = self
            .host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(&self.host);
        match &self.user {
            Some(user) => format!("{user}@{host}"),
            None => host.to_string(),
        }
    }

    /// `scp` remote target for `path`; brackets kept so the colon parses.
    #[must_use]
    pub fn scp_target(&self, path: &str) -> String {
        format!("{self}:{path}")
    }
}

/// A single `Key=Value` option passed to `ssh`/`scp` via `-o`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshOption {
    pub key: String,
    pub value: String,
}

impl fmt::Display for SshOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// Container runtime CLI present on the remote host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerRuntime {
    Docker,
    Podman,
}

impl ContainerRuntime {
    /// Program name invoked on the remote host.
    #[must_use]
    pub fn program(self) -> &'static str {
        match self {
            Self::Docker => "docker",
            Self::Podman => "podman",
        }
    }

    /// # Errors
    ///
    /// Returns `ConfigError::UnknownRuntime` for anything but docker/podman.
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "docker" => Ok(Self::Docker),
            "podman" => Ok(Self::Podman),
            _ => Err(ConfigError::UnknownRuntime(value.to_string())),
        }
    }
}

/// Target platform of the release; selects manifest name and installer type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Win,
    Mac,
    Linux,
}

impl Platform {
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownPlatform` for unrecognised names.
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "win" | "windows" => Ok(Self::Win),
            "mac" | "macos" | "darwin" => Ok(Self::Mac),
            "linux" => Ok(Self::Linux),
            _ => Err(ConfigError::UnknownPlatform(value.to_string())),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Win => "win",
            Self::Mac => "mac",
            Self::Linux => "linux",
        }
    }
}

// ── Config schema ────────────────────────────────────────────────────────────

/// Settings exactly as collected from flags and environment, before validation.
#[derive(Debug, Clone, Default)]
pub struct RawConfig {
    pub destination: Option<String>,
    pub port: Option<String>,
    pub key: Option<String>,
    pub ssh_options: Vec<String>,
    pub container: Option<String>,
    pub container_path: Option<String>,
    pub runtime: String,
    pub platform: String,
    pub multiplex: bool,
    pub project_dir: PathBuf,
    pub release_dir: Option<PathBuf>,
    pub log_file: PathBuf,
    pub ssh_bin: String,
    pub scp_bin: String,
    pub timeout_secs: u64,
    pub skip_verify: bool,
}

/// Validated deployment settings. Constructed only through [`DeployConfig::validate`].
#[derive(Debug, Clone)]
pub struct DeployConfig {
    pub destination: Destination,
    pub port: u16,
    pub identity: Option<PathBuf>,
    pub ssh_options: Vec<SshOption>,
    pub container: String,
    pub container_path: String,
    pub runtime: ContainerRuntime,
    pub platform: Platform,
    pub multiplex: bool,
    pub project_dir: PathBuf,
    pub release_dir: Option<PathBuf>,
    pub log_file: PathBuf,
    pub ssh_bin: String,
    pub scp_bin: String,
    pub timeout: Duration,
    pub skip_verify: bool,
}

impl DeployConfig {
    /// Validate every raw setting, failing on the first violation.
    ///
    /// `home` is used to expand a leading `~/` in the key path.
    ///
    /// # Errors
    ///
    /// Returns the first `ConfigError` encountered.
    pub fn validate(raw: RawConfig, home: Option<&Path>) -> Result<Self, ConfigError> {
        let destination = validate_destination(require("PUSHBOX_DEST", raw.destination.as_deref())?)?;
        let port = match raw.port.as_deref() {
            None => DEFAULT_PORT,
            Some(p) => parse_port(p)?,
        };
        let identity = match raw.key.as_deref() {
            None => None,
            Some(k) => Some(expand_home(require("PUSHBOX_KEY", Some(k))?, home)),
        };
        let ssh_options = parse_ssh_options(&raw.ssh_options)?;
        let container = require("PUSHBOX_CONTAINER", raw.container.as_deref())?;
        validate_container_name(container)?;
        let container_path = require("PUSHBOX_CONTAINER_PATH", raw.container_path.as_deref())?;
        let container_path = validate_container_path(container_path)?;
        let runtime = ContainerRuntime::parse(&raw.runtime)?;
        let platform = Platform::parse(&raw.platform)?;
        let ssh_bin = require("PUSHBOX_SSH_BIN", Some(raw.ssh_bin.as_str()))?.to_string();
        let scp_bin = require("PUSHBOX_SCP_BIN", Some(raw.scp_bin.as_str()))?.to_string();
        if raw.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }

        Ok(Self {
            destination,
            port,
            identity,
            ssh_options,
            container: container.to_string(),
            container_path,
            runtime,
            platform,
            multiplex: raw.multiplex,
            project_dir: raw.project_dir,
            release_dir: raw.release_dir,
            log_file: raw.log_file,
            ssh_bin,
            scp_bin,
            timeout: Duration::from_secs(raw.timeout_secs),
            skip_verify: raw.skip_verify,
        })
    }
}

// ── Validators ───────────────────────────────────────────────────────────────

/// Returns the trimmed value, or `ConfigError::Missing` when unset or blank.
///
/// # Errors
///
/// Returns an error if `value` is `None` or whitespace only.
pub fn require<'a>(name: &'static str, value: Option<&'a str>) -> Result<&'a str, ConfigError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ConfigError::Missing { name }),
    }
}

/// Parses a TCP port. Digits only; no sign, no whitespace, 1..=65535.
///
/// # Errors
///
/// Returns `ConfigError::InvalidPort` for anything else.
pub fn parse_port(value: &str) -> Result<u16, ConfigError> {
    let invalid = || ConfigError::InvalidPort(value.to_string());
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    match value.parse::<u32>() {
        Ok(n) if (1..=65535).contains(&n) => u16::try_from(n).map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

/// Validates a `[user@]host` destination.
///
/// # Errors
///
/// Returns `ConfigError::InvalidDestination` describing the first problem.
pub fn validate_destination(value: &str) -> Result<Destination, ConfigError> {
    let invalid = |reason| ConfigError::InvalidDestination {
        value: value.to_string(),
        reason,
    };
    if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(invalid("must not contain whitespace"));
    }
    let (user, host) = match value.split_once('@') {
        Some((user, host)) => {
            if host.contains('@') {
                return Err(invalid("more than one '@'"));
            }
            if !USER_RE.is_match(user) {
                return Err(invalid("user name contains invalid characters"));
            }
            (Some(user.to_string()), host)
        }
        None => (None, value),
    };
    if host.is_empty() {
        return Err(invalid("host is empty"));
    }
    if !HOST_RE.is_match(host) && !IPV6_RE.is_match(host) {
        return Err(invalid("host must be a hostname, IPv4 address or [IPv6] literal"));
    }
    Ok(Destination {
        user,
        host: host.to_string(),
    })
}

/// Parses one `Key=Value` connection option token.
///
/// # Errors
///
/// Returns `ConfigError::InvalidSshOption` if the token is malformed or names
/// a reserved option.
pub fn parse_ssh_option(token: &str) -> Result<SshOption, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidSshOption {
        token: token.to_string(),
        reason: reason.to_string(),
    };
    let Some((key, value)) = token.split_once('=') else {
        return Err(invalid("expected Key=Value"));
    };
    if !OPTION_KEY_RE.is_match(key) {
        return Err(invalid("option name must be alphanumeric"));
    }
    if !OPTION_VALUE_RE.is_match(value) {
        return Err(invalid("option value is empty or contains unsafe characters"));
    }
    if RESERVED_SSH_OPTIONS
        .iter()
        .any(|r| r.eq_ignore_ascii_case(key))
    {
        return Err(invalid(&format!("{key} is managed by pushbox")));
    }
    Ok(SshOption {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Parses whitespace-separated option tokens from one or more strings.
///
/// # Errors
///
/// Returns the error for the first malformed token.
pub fn parse_ssh_options(values: &[String]) -> Result<Vec<SshOption>, ConfigError> {
    values
        .iter()
        .flat_map(|v| v.split_whitespace())
        .map(parse_ssh_option)
        .collect()
}

/// # Errors
///
/// Returns `ConfigError::InvalidContainerName` if `name` breaks the Docker
/// naming rule.
pub fn validate_container_name(name: &str) -> Result<(), ConfigError> {
    if CONTAINER_NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(ConfigError::InvalidContainerName(name.to_string()))
    }
}

/// Validates an absolute in-container directory and strips trailing slashes.
///
/// # Errors
///
/// Returns `ConfigError::InvalidContainerPath` when the path is relative,
/// the root directory, contains `..`, or contains control characters.
pub fn validate_container_path(value: &str) -> Result<String, ConfigError> {
    let invalid = |reason| ConfigError::InvalidContainerPath {
        value: value.to_string(),
        reason,
    };
    if !value.starts_with('/') {
        return Err(invalid("must be absolute"));
    }
    if value.chars().any(char::is_control) {
        return Err(invalid("must not contain control characters"));
    }
    if value.split('/').any(|seg| seg == "..") {
        return Err(invalid("must not contain '..'"));
    }
    let trimmed = value.trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(invalid("must not be the root directory"));
    }
    Ok(trimmed.to_string())
}

/// Expands a leading `~/` using `home`. Other paths pass through unchanged.
#[must_use]
pub fn expand_home(value: &str, home: Option<&Path>) -> PathBuf {
    match (value.strip_prefix("~/"), home) {
        (Some(rest), Some(home)) => home.join(rest),
        _ if value == "~" => home.map_or_else(|| PathBuf::from(value), Path::to_path_buf),
        _ => PathBuf::from(value),
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
