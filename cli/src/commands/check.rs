//! `pushbox check` — validate settings and locate artifacts without touching
//! the remote host.

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::discover;
use crate::commands::target::TargetArgs;
use crate::infra::fs::StdFs;
use crate::output::json::{self, PlanReport};

/// Arguments for the check command.
#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub target: TargetArgs,
}

/// Run `pushbox check`.
///
/// # Errors
///
/// Returns an error if the settings are invalid or an artifact is missing.
pub fn run(app: &AppContext, args: &CheckArgs) -> Result<()> {
    let cfg = args.target.load()?;
    let discovery = discover::discover(&StdFs, &cfg)?;

    if app.is_json() {
        println!("{}", json::to_pretty(&PlanReport::new(&cfg, &discovery))?);
    } else {
        app.renderer().render_plan(&cfg, &discovery);
        app.output.success("Ready to deploy");
    }
    Ok(())
}
