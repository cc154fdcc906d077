//! The canonical configuration of one instance.
//!
//! The canonical configuration is the fully merged desired state that the reconcilers diff
//! against the server. It is rebuilt on every run from the merged templates, the
//! custom-format catalogue and the guide quality sizes; nothing is persisted.

use crate::catalog::CustomFormatCatalog;
use crate::guide::{GuideCustomFormat, TrashQualitySize};
use crate::input::{ArrType, InstanceConfig, QualitySort};
use crate::merger::MergedConfig;
use crate::specification::Specification;
use crate::{ConfigurationError, ConfigurationResult};
use secrecy::SecretString;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, warn};

#[cfg(test)]
#[path = "canonical_tests.rs"]
mod tests;

/// Name of the score set used when a profile names none, or names one a format lacks.
pub const DEFAULT_SCORE_SET: &str = "default";

/// A custom format with validated specifications.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalCustomFormat {
    /// Stable external identifier; never stored on the server
    pub trash_id: String,
    pub name: String,
    pub include_custom_format_when_renaming: bool,
    pub specifications: Vec<Specification>,
    /// Score per named score set
    pub score_sets: BTreeMap<String, i64>,
}

impl CanonicalCustomFormat {
    /// Validates a guide-shaped definition.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidSpecification` when any specification is invalid.
    pub fn from_guide(format: GuideCustomFormat) -> ConfigurationResult<Self> {
        let specifications = format
            .specifications
            .iter()
            .map(|value| Specification::from_json(&format.name, value))
            .collect::<ConfigurationResult<Vec<_>>>()?;

        Ok(Self {
            trash_id: format.trash_id,
            name: format.name,
            include_custom_format_when_renaming: format.include_custom_format_when_renaming,
            specifications,
            score_sets: format.trash_scores,
        })
    }
}

/// One entry of a desired quality list: a single quality, or a named group.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalQualityEntry {
    pub name: String,
    /// Member qualities of a group; empty for a single quality
    pub qualities: Vec<String>,
    pub enabled: bool,
}

impl CanonicalQualityEntry {
    pub fn is_group(&self) -> bool {
        !self.qualities.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct UpgradePolicy {
    pub allowed: bool,
    pub until_quality: Option<String>,
    pub until_score: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResetUnmatchedScores {
    pub enabled: bool,
    /// Format names whose score is never reset
    pub exceptions: BTreeSet<String>,
}

impl ResetUnmatchedScores {
    /// Returns `true` when an unassigned score of the format `name` must be forced to zero.
    pub fn applies_to(&self, name: &str) -> bool {
        self.enabled && !self.exceptions.contains(name)
    }
}

/// A custom format assigned to a profile, with an optional explicit score.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileScore {
    pub trash_id: String,
    pub score: Option<i64>,
}

/// The desired state of one quality profile.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalQualityProfile {
    pub name: String,
    /// Entries in configuration order
    pub qualities: Vec<CanonicalQualityEntry>,
    pub upgrade: UpgradePolicy,
    pub min_format_score: Option<i64>,
    pub quality_sort: QualitySort,
    pub score_set: Option<String>,
    pub reset_unmatched_scores: ResetUnmatchedScores,
    pub score_assignments: Vec<ProfileScore>,
}

/// Desired size envelope of one quality.
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredQualitySize {
    pub quality: String,
    pub min: f64,
    pub preferred: f64,
    pub max: f64,
}

/// Desired quality definitions: the guide sizes of one media type.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalQualityDefinition {
    pub kind: String,
    pub entries: Vec<DesiredQualitySize>,
    /// Position of the preferred size between min and max
    pub preferred_ratio: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeleteUnmanagedPolicy {
    pub enabled: bool,
    pub ignore: BTreeSet<String>,
}

/// The complete desired state of one instance.
#[derive(Debug)]
pub struct CanonicalConfig {
    pub instance_name: String,
    pub arr_type: ArrType,
    pub base_url: String,
    pub api_key: SecretString,
    /// Managed formats in order of first reference
    pub custom_formats: Vec<CanonicalCustomFormat>,
    pub quality_profiles: Vec<CanonicalQualityProfile>,
    pub quality_definition: Option<CanonicalQualityDefinition>,
    pub delete_unmanaged: DeleteUnmanagedPolicy,
}

impl CanonicalConfig {
    /// Assembles the canonical configuration of one instance.
    ///
    /// # Arguments
    ///
    /// * `arr_type` / `instance_name` - Identity of the instance, used in messages
    /// * `instance` - The instance's raw configuration (connection settings)
    /// * `merged` - The instance merged with its templates
    /// * `catalog` - Every known custom format
    /// * `quality_sizes` - Guide quality sizes of the application
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::RequiredConfigMissing` when `base_url` or `api_key` is
    /// missing. Unknown trash ids, assignments to unknown profiles and unknown quality
    /// definition types are warnings.
    pub fn build(
        arr_type: ArrType,
        instance_name: &str,
        instance: &InstanceConfig,
        merged: MergedConfig,
        catalog: &CustomFormatCatalog,
        quality_sizes: &[TrashQualitySize],
    ) -> ConfigurationResult<Self> {
        let required = |value: &Option<String>, key: &str| {
            value
                .clone()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigurationError::RequiredConfigMissing {
                    key: format!("{}.{}.{}", arr_type, instance_name, key),
                })
        };
        let base_url = required(&instance.base_url, "base_url")?;
        let api_key = SecretString::from(required(&instance.api_key, "api_key")?);

        let mut profiles: Vec<CanonicalQualityProfile> = merged
            .quality_profiles
            .into_iter()
            .filter_map(|input| {
                let name = input.name?;
                let qualities = input
                    .qualities?
                    .into_iter()
                    .map(|entry| CanonicalQualityEntry {
                        name: entry.name,
                        qualities: entry.qualities,
                        enabled: entry.enabled.unwrap_or(true),
                    })
                    .collect();
                let upgrade = input.upgrade?;
                let reset = input.reset_unmatched_scores.unwrap_or_default();

                Some(CanonicalQualityProfile {
                    name,
                    qualities,
                    upgrade: UpgradePolicy {
                        allowed: upgrade.allowed.unwrap_or(false),
                        until_quality: upgrade.until_quality,
                        until_score: upgrade.until_score,
                    },
                    min_format_score: input.min_format_score,
                    quality_sort: input.quality_sort.unwrap_or_default(),
                    score_set: input.score_set,
                    reset_unmatched_scores: ResetUnmatchedScores {
                        enabled: reset.enabled.unwrap_or(false),
                        exceptions: reset.except.unwrap_or_default().into_iter().collect(),
                    },
                    score_assignments: Vec::new(),
                })
            })
            .collect();

        let mut custom_formats = Vec::new();
        let mut managed: HashSet<String> = HashSet::new();
        let mut warned_profiles: HashSet<String> = HashSet::new();

        for block in &merged.custom_formats {
            let known_ids: Vec<&String> = block
                .trash_ids
                .iter()
                .filter(|trash_id| {
                    let known = catalog.get(trash_id).is_some();
                    if !known {
                        warn!(
                            instance = instance_name,
                            trash_id = %trash_id,
                            "Unknown custom format trash id, skipping"
                        );
                    }
                    known
                })
                .collect();

            for trash_id in &known_ids {
                if managed.insert((*trash_id).clone()) {
                    if let Some(format) = catalog.get(trash_id) {
                        custom_formats.push(format.clone());
                    }
                }
            }

            for assignment in &block.assign_scores_to {
                let Some(profile) = profiles.iter_mut().find(|p| p.name == assignment.name) else {
                    if warned_profiles.insert(assignment.name.clone()) {
                        warn!(
                            instance = instance_name,
                            profile = %assignment.name,
                            "Scores assigned to a quality profile that is not configured"
                        );
                    }
                    continue;
                };
                for trash_id in &known_ids {
                    assign_score(profile, trash_id, assignment.score);
                }
            }
        }

        let quality_definition = match merged.quality_definition {
            Some(definition) => match definition.kind {
                Some(kind) => {
                    let size = quality_sizes
                        .iter()
                        .find(|size| size.kind.eq_ignore_ascii_case(&kind));
                    match size {
                        Some(size) => Some(CanonicalQualityDefinition {
                            kind,
                            entries: size
                                .qualities
                                .iter()
                                .map(|entry| DesiredQualitySize {
                                    quality: entry.quality.clone(),
                                    min: entry.min,
                                    preferred: entry.preferred,
                                    max: entry.max,
                                })
                                .collect(),
                            preferred_ratio: definition.preferred_ratio,
                        }),
                        None => {
                            warn!(instance = instance_name, kind = %kind, "Unknown quality definition type");
                            None
                        }
                    }
                }
                None => {
                    warn!(instance = instance_name, "quality_definition has no 'type', ignoring it");
                    None
                }
            },
            None => None,
        };

        let delete_unmanaged = merged
            .delete_unmanaged_custom_formats
            .map(|policy| DeleteUnmanagedPolicy {
                enabled: policy.enabled,
                ignore: policy.ignore.into_iter().collect(),
            })
            .unwrap_or_default();

        debug!(
            instance = instance_name,
            custom_formats = custom_formats.len(),
            quality_profiles = profiles.len(),
            "Canonical configuration built"
        );

        Ok(Self {
            instance_name: instance_name.to_string(),
            arr_type,
            base_url,
            api_key,
            custom_formats,
            quality_profiles: profiles,
            quality_definition,
            delete_unmanaged,
        })
    }

    pub fn custom_format(&self, trash_id: &str) -> Option<&CanonicalCustomFormat> {
        self.custom_formats.iter().find(|cf| cf.trash_id == trash_id)
    }
}

/// A later explicit score for the same format and profile replaces the earlier one; a later
/// assignment without a score keeps it.
fn assign_score(profile: &mut CanonicalQualityProfile, trash_id: &str, score: Option<i64>) {
    match profile
        .score_assignments
        .iter_mut()
        .find(|existing| existing.trash_id == trash_id)
    {
        Some(existing) => {
            if score.is_some() {
                existing.score = score;
            }
        }
        None => profile.score_assignments.push(ProfileScore {
            trash_id: trash_id.to_string(),
            score,
        }),
    }
}
