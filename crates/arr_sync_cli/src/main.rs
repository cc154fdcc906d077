use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod errors;

use crate::config::RunSettings;

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;

/// Environment variable holding a full tracing filter, e.g. `arr_sync_core=debug`
const LOG_FILTER_ENV: &str = "ARR_SYNC_LOG";

/// Exit code when at least one instance reported errors
const EXIT_INSTANCE_FAILED: u8 = 1;

/// Exit code when the run could not start
const EXIT_FATAL: u8 = 2;

/// arr-sync: Synchronize Sonarr and Radarr quality settings with a declarative configuration
#[derive(Parser)]
#[command(name = "arr-sync")]
#[command(about = "Synchronize Sonarr and Radarr quality profiles, custom formats and quality definitions", long_about = None)]
struct Cli {
    #[command(flatten)]
    settings: RunSettings,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// Synchronize every enabled instance (default)
    Sync,

    /// Load and merge the configuration without contacting any instance
    Validate {
        /// Clone or update the guide and template repositories first
        #[arg(long)]
        update_checkouts: bool,
    },

    /// Show the CLI version
    Version,
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let succeeded = match cli.command.unwrap_or(Commands::Sync) {
        Commands::Sync => commands::sync_cmd::execute(&cli.settings)
            .await
            .context("Synchronization could not start")?
            .is_success(),
        Commands::Validate { update_checkouts } => {
            commands::validate_cmd::execute(&cli.settings, update_checkouts)
                .await
                .context("Validation could not start")?
        }
        Commands::Version => {
            println!(
                "arr-sync version {}",
                option_env!("ARR_SYNC_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
            );
            true
        }
    };

    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_INSTANCE_FAILED)
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.settings.log_level);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("Error: {e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::from(EXIT_FATAL)
        }
    }
}
