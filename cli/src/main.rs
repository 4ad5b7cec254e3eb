//! pushbox - ship an installer and its update manifest into a running container

#![cfg_attr(test, allow(clippy::expect_used))]

use clap::Parser;
use tracing_subscriber::EnvFilter;

use pushbox::cli::Cli;
use pushbox::commands;
use pushbox::output::json;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level())),
        )
        .with_writer(std::io::stderr)
        .with_ansi(!cli.no_color && console::Term::stderr().is_term())
        .with_target(false)
        .init();

    let json_mode = cli.json;
    if let Err(e) = cli.run().await {
        let code = commands::exit_code(&e);
        tracing::debug!(error = ?e, code, "command failed");
        match json::format_error(&format!("{e:#}"), code) {
            Ok(doc) if json_mode => println!("{doc}"),
            _ => eprintln!("Error: {e:#}"),
        }
        std::process::exit(code);
    }
}
