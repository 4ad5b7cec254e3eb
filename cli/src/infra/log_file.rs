//! Infrastructure implementation of the `DeployLog` port.

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;

use crate::application::ports::{DeployLog, LogEntry};

/// Writes the install step's output to a local file, replacing any
/// previous run's log.
pub struct FileDeployLog {
    path: PathBuf,
}

impl FileDeployLog {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl DeployLog for FileDeployLog {
    fn record(&self, entry: &LogEntry<'_>) -> Result<PathBuf> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("cannot create {}", parent.display()))?;
        }
        std::fs::write(&self.path, render(entry))
            .with_context(|| format!("cannot write {}", self.path.display()))?;
        Ok(self.path.clone())
    }
}

fn render(entry: &LogEntry<'_>) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "# pushbox install log");
    let _ = writeln!(text, "# time:        {}", Utc::now().to_rfc3339());
    let _ = writeln!(text, "# destination: {}", entry.destination);
    let _ = writeln!(
        text,
        "# target:      {}:{}",
        entry.container, entry.container_path
    );
    let _ = writeln!(text, "# staging:     {}", entry.remote_tmp);
    match entry.output.status.code() {
        Some(code) => {
            let _ = writeln!(text, "# exit code:   {code}");
        }
        None => {
            let _ = writeln!(text, "# exit code:   (killed by signal)");
        }
    }
    text.push_str("\n## stdout\n");
    text.push_str(&String::from_utf8_lossy(&entry.output.stdout));
    text.push_str("\n## stderr\n");
    text.push_str(&String::from_utf8_lossy(&entry.output.stderr));
    text
}
