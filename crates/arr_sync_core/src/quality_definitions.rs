//! Quality-definition reconciliation.
//!
//! Desired size envelopes are matched to server definitions by quality name (or display
//! title). The server only accepts the complete list in one bulk request, so the result
//! carries the full server list with every change applied.

use crate::errors::{SyncError, SyncResult};
use arr_client::ServerQualityDefinition;
use arr_config::{CanonicalQualityDefinition, DesiredQualitySize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

#[cfg(test)]
#[path = "quality_definitions_tests.rs"]
mod tests;

const SIZE_TOLERANCE: f64 = 1e-6;

/// Linear interpolation of the preferred size between `min` and `max`.
///
/// # Errors
///
/// Returns `SyncError::InvalidRatio` when `ratio` is outside `[0, 1]`.
pub fn interpolate_preferred_size(min: f64, max: f64, ratio: f64) -> SyncResult<f64> {
    if !(0.0..=1.0).contains(&ratio) {
        return Err(SyncError::InvalidRatio { ratio });
    }
    Ok(min + ratio * (max - min))
}

/// The outcome of a quality-definition comparison.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QualityDefinitionDiff {
    /// Change messages per quality name
    pub change_map: BTreeMap<String, Vec<String>>,
    /// Desired qualities the server does not know
    pub create: Vec<DesiredQualitySize>,
    /// The full server list with every change applied, ready for the bulk update
    pub rest_data: Vec<ServerQualityDefinition>,
}

impl QualityDefinitionDiff {
    pub fn has_changes(&self) -> bool {
        !self.change_map.is_empty()
    }
}

/// Compares the desired sizes with the server definitions.
///
/// A `preferred_ratio` inside `[0, 1]` replaces every desired preferred size with the
/// interpolated value; a ratio outside that range is ignored with a warning.
pub fn reconcile(
    server: &[ServerQualityDefinition],
    desired: &CanonicalQualityDefinition,
) -> QualityDefinitionDiff {
    let ratio = match desired.preferred_ratio {
        Some(ratio) if (0.0..=1.0).contains(&ratio) => Some(ratio),
        Some(ratio) => {
            warn!(ratio, "preferred_ratio is outside [0, 1], using the configured preferred sizes");
            None
        }
        None => None,
    };

    let mut diff = QualityDefinitionDiff {
        rest_data: server.to_vec(),
        ..Default::default()
    };

    for entry in &desired.entries {
        let preferred = ratio
            .and_then(|ratio| interpolate_preferred_size(entry.min, entry.max, ratio).ok())
            .unwrap_or(entry.preferred);

        let Some(current) = diff
            .rest_data
            .iter_mut()
            .find(|definition| definition.matches(&entry.quality))
        else {
            warn!(quality = %entry.quality, "Quality is not known to the server");
            diff.create.push(DesiredQualitySize {
                preferred,
                ..entry.clone()
            });
            continue;
        };

        let mut changes = Vec::new();
        update_size("min", &mut current.min_size, entry.min, &mut changes);
        update_size("max", &mut current.max_size, entry.max, &mut changes);
        update_size("preferred", &mut current.preferred_size, preferred, &mut changes);

        if !changes.is_empty() {
            debug!(quality = %entry.quality, changes = ?changes, "Quality definition differs");
            diff.change_map.insert(entry.quality.clone(), changes);
        }
    }

    diff
}

fn update_size(label: &str, current: &mut Option<f64>, desired: f64, changes: &mut Vec<String>) {
    let equal = current.is_some_and(|value| (value - desired).abs() < SIZE_TOLERANCE);
    if !equal {
        changes.push(match current {
            Some(value) => format!("{}: {} -> {}", label, value, desired),
            None => format!("{}: unlimited -> {}", label, desired),
        });
        *current = Some(desired);
    }
}
