//! Human-readable terminal renderer.

use crate::application::services::deploy::DeployOutcome;
use crate::application::services::discover::Discovery;
use crate::domain::artifact::ChecksumStatus;
use crate::domain::config::DeployConfig;
use crate::output::OutputContext;

/// Renders plans and outcomes as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Render the version line.
    pub fn render_version(&self, version: &str) {
        if !self.ctx.quiet {
            println!("pushbox {version}");
        }
    }

    /// Render what is about to be shipped and where.
    pub fn render_plan(&self, cfg: &DeployConfig, discovery: &Discovery) {
        if self.ctx.quiet {
            return;
        }
        let a = &discovery.artifacts;
        println!();
        self.ctx.header(&format!("Release {}", a.version));
        self.ctx.kv("Directory:", &a.release_dir.display().to_string());
        self.ctx.kv("Installer:", &file_label(&a.installer));
        if let Some(blockmap) = &a.blockmap {
            self.ctx.kv("Blockmap:", &file_label(blockmap));
        }
        self.ctx.kv("Manifest:", &file_label(&a.manifest));
        self.ctx.kv("Checksum:", checksum_label(a.checksum));
        println!();
        self.ctx.header("Target");
        self.ctx
            .kv("Host:", &format!("{} (port {})", cfg.destination, cfg.port));
        self.ctx.kv(
            "Container:",
            &format!("{} ({})", cfg.container, cfg.runtime.program()),
        );
        self.ctx.kv("Path:", &cfg.container_path);
        self.ctx.kv(
            "Connection:",
            if cfg.multiplex { "shared (control master)" } else { "one per step" },
        );
        println!();
        for warning in &discovery.warnings {
            self.ctx.warn(warning);
        }
    }

    /// Render the details of a completed deployment.
    pub fn render_outcome(&self, outcome: &DeployOutcome) {
        if self.ctx.quiet {
            return;
        }
        println!();
        self.ctx.kv("Installed:", &outcome.installed.join(", "));
        if let Some(log_file) = &outcome.log_file {
            self.ctx.kv("Log:", &log_file.display().to_string());
        }
    }
}

fn file_label(path: &std::path::Path) -> String {
    let name = crate::domain::artifact::file_name(path).unwrap_or("?");
    match std::fs::metadata(path) {
        Ok(meta) => format!("{name} ({})", human_size(meta.len())),
        Err(_) => name.to_string(),
    }
}

fn checksum_label(status: ChecksumStatus) -> &'static str {
    match status {
        ChecksumStatus::Verified => "sha512 matches manifest",
        ChecksumStatus::Skipped => "not verified (--skip-verify)",
        ChecksumStatus::Unavailable => "not verified (manifest has no sha512)",
    }
}

/// Format a byte count with binary units, one decimal place.
#[must_use]
pub fn human_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KiB", "MiB", "GiB"];
    let mut unit = 0;
    let mut tenths = u128::from(bytes) * 10;
    while tenths >= 10_240 && unit + 1 < UNITS.len() {
        tenths /= 1024;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{}.{} {}", tenths / 10, tenths % 10, UNITS[unit])
    }
}
