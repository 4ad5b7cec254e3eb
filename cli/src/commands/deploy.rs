//! `pushbox deploy` — ship the current release into the container.

use anyhow::{Context, Result};
use clap::Args;

use crate::app::AppContext;
use crate::application::services::deploy::deploy;
use crate::application::services::discover;
use crate::application::services::session::SshSession;
use crate::commands::target::TargetArgs;
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::fs::StdFs;
use crate::infra::log_file::FileDeployLog;
use crate::infra::signal::shutdown_signal;
use crate::output::TerminalReporter;
use crate::output::json::{self, DeployReport, PlanReport};

/// Name of the control socket inside the private temp dir.
const CONTROL_SOCKET: &str = "cm.sock";

/// Arguments for the deploy command.
#[derive(Args, Debug)]
pub struct DeployArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Skip the confirmation prompt (also set by `CI` / `PUSHBOX_YES`)
    #[arg(short, long)]
    pub yes: bool,
}

/// Run `pushbox deploy`.
///
/// Validation and artifact discovery complete before anything touches the
/// remote host.
///
/// # Errors
///
/// Returns an error if validation, discovery or any remote step fails, or
/// if the run is interrupted.
pub async fn run(app: &AppContext, args: &DeployArgs) -> Result<()> {
    let cfg = args.target.load()?;
    let discovery = discover::discover(&StdFs, &cfg)?;

    if !app.is_json() {
        app.renderer().render_plan(&cfg, &discovery);
    }
    let prompt = format!(
        "Deploy {} to {}:{} on {}?",
        discovery.artifacts.version, cfg.container, cfg.container_path, cfg.destination
    );
    if !app.confirm(&prompt, false)? {
        if app.is_json() {
            let report = DeployReport::cancelled(PlanReport::new(&cfg, &discovery));
            println!("{}", json::to_pretty(&report)?);
        } else {
            app.output.warn("Cancelled.");
        }
        return Ok(());
    }

    let control_dir = if cfg.multiplex {
        Some(
            tempfile::Builder::new()
                .prefix("pushbox-")
                .tempdir()
                .context("cannot create control socket directory")?,
        )
    } else {
        None
    };
    let control_path = control_dir.as_ref().map(|d| d.path().join(CONTROL_SOCKET));

    let runner = TokioCommandRunner::new(cfg.timeout);
    let session = SshSession::new(&runner, &cfg, control_path);
    let log = FileDeployLog::new(cfg.log_file.clone());
    let reporter = TerminalReporter::new(&app.output);

    let outcome = match deploy(
        &session,
        &cfg,
        &discovery.artifacts,
        &log,
        &reporter,
        shutdown_signal(),
    )
    .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            reporter.fail_current();
            return Err(e);
        }
    };
    drop(reporter);

    if app.is_json() {
        let report = DeployReport::new(PlanReport::new(&cfg, &discovery), &outcome);
        println!("{}", json::to_pretty(&report)?);
    } else {
        app.renderer().render_outcome(&outcome);
    }
    Ok(())
}
