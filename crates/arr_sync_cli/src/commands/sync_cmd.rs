//! The `sync` command.

use arr_client::ArrHttpClient;
use arr_config::load_input_config;
use arr_sync_core::{InstanceSynchronizer, SyncOptions, SyncReport};
use tracing::{error, info, instrument, warn};

use crate::commands::instances::{prepare_instances, Checkouts, PreparedInstance};
use crate::config::RunSettings;
use crate::errors::Error;

#[cfg(test)]
#[path = "sync_cmd_tests.rs"]
mod tests;

/// Result of a complete run over all instances.
#[derive(Debug, Default)]
pub struct RunOutcome {
    /// Reports of the instances that were contacted
    pub reports: Vec<SyncReport>,
    /// Labels of the instances that failed, in processing order
    pub failed: Vec<String>,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Loads the configuration, updates the checkouts and synchronizes every enabled instance.
///
/// # Errors
///
/// Returns an error when the configuration cannot be loaded or a checkout fails. Failures
/// of single instances are reported through [`RunOutcome`].
#[instrument(skip(settings), fields(config = ?settings.config_location, dry_run = settings.dry_run))]
pub async fn execute(settings: &RunSettings) -> Result<RunOutcome, Error> {
    let input = load_input_config(settings.config_location(), Some(settings.secrets_location()))?;
    let checkouts = Checkouts::ensure(&input, settings).await?;
    let prepared = prepare_instances(&input, &checkouts).await;

    let outcome = run_instances(
        prepared,
        SyncOptions {
            dry_run: settings.dry_run,
        },
    )
    .await;

    for report in &outcome.reports {
        println!(
            "{}: custom formats {}/{}/{} (created/updated/deleted), profiles {}/{} (created/updated), {} errors",
            report.instance,
            report.custom_formats.created,
            report.custom_formats.updated,
            report.custom_formats.deleted,
            report.quality_profiles.created,
            report.quality_profiles.updated,
            report.errors.len()
        );
    }
    Ok(outcome)
}

/// Synchronizes the prepared instances one after another, each through its own client.
pub async fn run_instances(prepared: Vec<PreparedInstance>, options: SyncOptions) -> RunOutcome {
    let mut outcome = RunOutcome::default();

    for instance in prepared {
        let label = instance.label();
        let config = match instance.config {
            Ok(config) => config,
            Err(e) => {
                error!(instance = %label, error = %e, "Instance configuration is invalid, skipping");
                outcome.failed.push(label);
                continue;
            }
        };

        let client = match ArrHttpClient::new(&config.base_url, config.api_key.clone()) {
            Ok(client) => client,
            Err(e) => {
                error!(instance = %label, error = %e, "Failed to create client, skipping");
                outcome.failed.push(label);
                continue;
            }
        };

        info!(instance = %label, base_url = %config.base_url, "Processing instance");
        let mut report = InstanceSynchronizer::new(&client, options).sync(&config).await;
        report.instance = label.clone();

        if report.is_success() {
            info!(instance = %label, "Instance synchronized");
        } else {
            for e in &report.errors {
                warn!(instance = %label, error = %e, "Synchronization error");
            }
            outcome.failed.push(label);
        }
        outcome.reports.push(report);
    }

    outcome
}
