//! growlog CLI - capture farm observations from the terminal
//!
//! Observations are queued locally first, so logging works in a barn with no
//! signal; `growlog sync` or `growlog watch` pushes them once a connection is
//! back.

mod auth;
mod cli;
mod commands;
mod config_profiles;
mod error;

use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::auth_cmd::run_auth;
use crate::commands::calc::run_calc;
use crate::commands::common::CliContext;
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::log::run_log;
use crate::commands::queue::run_queue;
use crate::commands::sync::run_sync;
use crate::commands::watch::run_watch;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let directive = "growlog=info"
        .parse()
        .map_err(|error| CliError::Config(format!("invalid log directive: {error}")))?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(directive))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let profile = cli.profile.as_deref();

    match cli.command {
        Commands::Log(args) => {
            let context = CliContext::load(cli.db_path, profile)?;
            run_log(&args, &context)?;
        }
        Commands::Queue { json } => {
            let context = CliContext::load(cli.db_path, profile)?;
            run_queue(json, &context)?;
        }
        Commands::Sync { offline } => {
            let context = CliContext::load(cli.db_path, profile)?;
            run_sync(offline, &context).await?;
        }
        Commands::Watch { interval } => {
            let context = CliContext::load(cli.db_path, profile)?;
            run_watch(interval, &context).await?;
        }
        Commands::Calc { command } => run_calc(command)?,
        Commands::Config { command } => run_config(command, profile)?,
        Commands::Auth { command } => {
            let context = CliContext::load(cli.db_path, profile)?;
            run_auth(command, &context).await?;
        }
        Commands::Completions { shell, output } => {
            run_completions(shell, output.as_deref())?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests;
