//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain` — never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use anyhow::Result;

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output.
    ///
    /// Implementations should delegate to `run_with_timeout` using the
    /// instance's configured default timeout.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;
    /// Run a program with a custom timeout override.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned).
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output>;
    /// Run a program with stdin piped from `stdin`.
    async fn run_with_stdin(&self, program: &str, args: &[&str], stdin: &[u8]) -> Result<Output>;
    /// Run a program with inherited stdio and return only its exit status.
    ///
    /// Used where the child may need the terminal (passphrase prompts).
    async fn run_status(&self, program: &str, args: &[&str]) -> Result<std::process::ExitStatus>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait — no async needed.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
    /// Emit one line of captured remote output (diagnostics).
    fn detail(&self, line: &str);
}

// ── Filesystem Port ───────────────────────────────────────────────────────────

/// Read-only view of the local release tree.
pub trait LocalFs {
    fn is_dir(&self, path: &Path) -> bool;
    fn is_file(&self, path: &Path) -> bool;
    /// Read a UTF-8 file.
    fn read_to_string(&self, path: &Path) -> Result<String>;
    /// File names (not paths) of regular files in `dir`, sorted.
    fn list_files(&self, dir: &Path) -> Result<Vec<String>>;
    /// Base64-encoded SHA-512 digest of a file.
    fn sha512_base64(&self, path: &Path) -> Result<String>;
}

// ── Deploy Log Port ───────────────────────────────────────────────────────────

/// What gets recorded about the install step.
pub struct LogEntry<'a> {
    pub destination: &'a str,
    pub container: &'a str,
    pub container_path: &'a str,
    pub remote_tmp: &'a str,
    pub output: &'a Output,
}

/// Persists the install step's output locally.
pub trait DeployLog {
    /// Write the entry, returning where it went.
    fn record(&self, entry: &LogEntry<'_>) -> Result<PathBuf>;
}
