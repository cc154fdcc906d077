//! The `validate` command: assembles every instance without contacting it.

use arr_config::{load_input_config, CanonicalConfig};
use tracing::{error, info, instrument};

use crate::commands::instances::{prepare_instances, Checkouts};
use crate::config::RunSettings;
use crate::errors::Error;

#[cfg(test)]
#[path = "validate_cmd_tests.rs"]
mod tests;

/// Validates the configuration and prints a summary of every enabled instance.
///
/// The guide and template checkouts are only updated when `update_checkouts` is set;
/// otherwise the checkouts already present below the root path are used.
///
/// Returns `true` when every instance assembled without errors.
///
/// # Errors
///
/// Returns an error when the configuration cannot be loaded or a checkout fails.
#[instrument(skip(settings), fields(config = ?settings.config_location))]
pub async fn execute(settings: &RunSettings, update_checkouts: bool) -> Result<bool, Error> {
    let input = load_input_config(settings.config_location(), Some(settings.secrets_location()))?;
    let checkouts = if update_checkouts {
        Checkouts::ensure(&input, settings).await?
    } else {
        Checkouts::existing(settings)
    };

    let mut valid = true;
    for instance in prepare_instances(&input, &checkouts).await {
        let label = instance.label();
        match &instance.config {
            Ok(config) => {
                info!(instance = %label, "Instance configuration is valid");
                println!("{}: {}", label, summary(config));
            }
            Err(e) => {
                error!(instance = %label, error = %e, "Instance configuration is invalid");
                println!("{}: invalid: {}", label, e);
                valid = false;
            }
        }
    }
    Ok(valid)
}

/// One-line description of an assembled instance.
pub fn summary(config: &CanonicalConfig) -> String {
    let profiles: Vec<&str> = config
        .quality_profiles
        .iter()
        .map(|profile| profile.name.as_str())
        .collect();
    let definition = config
        .quality_definition
        .as_ref()
        .map(|definition| definition.kind.as_str())
        .unwrap_or("none");

    format!(
        "{} custom formats, quality profiles [{}], quality definition {}, delete unmanaged {}",
        config.custom_formats.len(),
        profiles.join(", "),
        definition,
        if config.delete_unmanaged.enabled { "on" } else { "off" }
    )
}
