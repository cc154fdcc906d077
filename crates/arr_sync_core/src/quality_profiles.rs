//! Quality-profile reconciliation.
//!
//! Every desired profile resolves independently:
//!
//! ```text
//! not on server ──► build ──► Create
//! on server     ──► quality list diff ─┐
//!                   scalar diff ───────┼──► Update if any differs, else Unchanged
//!                   score diff ────────┘
//! ```
//!
//! The application renders position 0 of a profile's quality list as the lowest priority.
//! Desired lists are written top-first (`quality_sort: top`) or bottom-first
//! (`quality_sort: bottom`); every quality of the server catalogue that the desired list does
//! not mention is kept as a disabled entry at the lowest priority.
//!
//! A quality-list change always replaces the whole list, and a score change always sends
//! the complete `formatItems` array.

use crate::diff::DiffResult;
use crate::errors::{SyncError, SyncResult};
use crate::score_resolver::resolve_score;
use arr_client::{
    ProfileFormatItem, QualityInfo, QualityProfileItem, ServerQualityDefinition,
    ServerQualityProfile,
};
use arr_config::{CanonicalCustomFormat, CanonicalQualityProfile, QualitySort};
use serde_json::Map;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

#[cfg(test)]
#[path = "quality_profiles_tests.rs"]
mod tests;

/// Group ids start above this value; lower ids belong to single qualities.
const GROUP_ID_FLOOR: i64 = 1000;

/// One quality level known to the server.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityCatalogueEntry {
    pub id: i64,
    pub name: String,
    pub resolution: Option<i64>,
    pub source: Option<String>,
    pub sort_weight: i64,
}

impl QualityCatalogueEntry {
    /// The server's qualities, lowest weight first.
    pub fn from_definitions(definitions: &[ServerQualityDefinition]) -> Vec<Self> {
        let mut catalogue: Vec<Self> = definitions
            .iter()
            .map(|definition| Self {
                id: definition.quality.id,
                name: definition.quality.name.clone(),
                resolution: definition.quality.resolution,
                source: definition.quality.source.clone(),
                sort_weight: definition.weight,
            })
            .collect();
        catalogue.sort_by_key(|entry| entry.sort_weight);
        catalogue
    }

    fn to_quality_info(&self) -> QualityInfo {
        QualityInfo {
            id: self.id,
            name: self.name.clone(),
            source: self.source.clone(),
            resolution: self.resolution,
            extra: Map::new(),
        }
    }
}

/// Profile diff plus the profiles that could not be reconciled.
#[derive(Debug, Clone, Default)]
pub struct QualityProfileDiff {
    pub diff: DiffResult<ServerQualityProfile>,
    /// Reference errors, one per skipped profile
    pub errors: Vec<SyncError>,
}

enum ProfileOutcome {
    Create(ServerQualityProfile),
    Update(ServerQualityProfile, Vec<String>),
    Unchanged,
}

/// Reconciles desired profiles against the server's profiles.
pub struct QualityProfileReconciler<'a> {
    catalogue: &'a [QualityCatalogueEntry],
    formats: &'a [CanonicalCustomFormat],
    format_ids: &'a BTreeMap<String, i64>,
}

impl<'a> QualityProfileReconciler<'a> {
    /// # Arguments
    ///
    /// * `catalogue` - The server's qualities, see [`QualityCatalogueEntry::from_definitions`]
    /// * `formats` - The managed custom formats, for score lookup by trash id
    /// * `format_ids` - Server ids of custom formats by name, after the custom-format stage
    pub fn new(
        catalogue: &'a [QualityCatalogueEntry],
        formats: &'a [CanonicalCustomFormat],
        format_ids: &'a BTreeMap<String, i64>,
    ) -> Self {
        Self {
            catalogue,
            formats,
            format_ids,
        }
    }

    pub fn reconcile(
        &self,
        desired: &[CanonicalQualityProfile],
        server: &[ServerQualityProfile],
    ) -> QualityProfileDiff {
        let mut result = QualityProfileDiff::default();

        for profile in desired {
            let existing = server.iter().find(|p| p.name == profile.name);
            match self.reconcile_profile(profile, existing, server.first()) {
                Ok(ProfileOutcome::Create(payload)) => {
                    result
                        .diff
                        .change_log
                        .insert(profile.name.clone(), vec!["create".to_string()]);
                    result.diff.to_create.push(payload);
                }
                Ok(ProfileOutcome::Update(payload, changes)) => {
                    result.diff.change_log.insert(profile.name.clone(), changes);
                    result.diff.to_update.push(payload);
                }
                Ok(ProfileOutcome::Unchanged) => result.diff.unchanged.push(profile.name.clone()),
                Err(e) => {
                    warn!(profile = %profile.name, error = %e, "Skipping quality profile");
                    result.errors.push(e);
                }
            }
        }

        result
    }

    fn reconcile_profile(
        &self,
        desired: &CanonicalQualityProfile,
        existing: Option<&ServerQualityProfile>,
        template: Option<&ServerQualityProfile>,
    ) -> SyncResult<ProfileOutcome> {
        let items = self.build_items(desired, existing)?;
        let cutoff = resolve_cutoff(desired, &items)?;
        let scores = self.desired_scores(desired);

        let Some(existing) = existing else {
            debug!(profile = %desired.name, "Quality profile missing on server");
            return Ok(ProfileOutcome::Create(self.build_new(
                desired, items, cutoff, &scores, template,
            )));
        };

        let mut updated = existing.clone();
        let mut changes = Vec::new();

        if let Some(change) = quality_list_change(&existing.items, &items) {
            changes.push(change);
            updated.items = items;
        }

        let min_format_score = desired.min_format_score.unwrap_or(existing.min_format_score);
        scalar_change(&mut changes, "minFormatScore", &mut updated.min_format_score, min_format_score);
        scalar_change(
            &mut changes,
            "upgradeAllowed",
            &mut updated.upgrade_allowed,
            desired.upgrade.allowed,
        );
        scalar_change(&mut changes, "cutoff", &mut updated.cutoff, cutoff);
        if let Some(until_score) = desired.upgrade.until_score {
            scalar_change(
                &mut changes,
                "cutoffFormatScore",
                &mut updated.cutoff_format_score,
                until_score,
            );
        }

        let (format_items, score_changes) = self.score_items(desired, &existing.format_items, &scores);
        if !score_changes.is_empty() {
            changes.extend(score_changes);
            updated.format_items = format_items;
        }

        if changes.is_empty() {
            Ok(ProfileOutcome::Unchanged)
        } else {
            Ok(ProfileOutcome::Update(updated, changes))
        }
    }

    /// The server-ordered quality list for a desired profile.
    fn build_items(
        &self,
        desired: &CanonicalQualityProfile,
        existing: Option<&ServerQualityProfile>,
    ) -> SyncResult<Vec<QualityProfileItem>> {
        let existing_items = existing.map(|p| p.items.as_slice()).unwrap_or_default();
        let mut next_group_id = existing_items
            .iter()
            .filter(|item| item.is_group())
            .filter_map(|item| item.id)
            .fold(GROUP_ID_FLOOR, i64::max);

        let mut seen: HashSet<&'a str> = HashSet::new();
        let mark_seen = |name: &'a str, seen: &mut HashSet<&'a str>| -> SyncResult<()> {
            if seen.insert(name) {
                Ok(())
            } else {
                Err(SyncError::DuplicateQuality {
                    profile: desired.name.clone(),
                    quality: name.to_string(),
                })
            }
        };

        let mut ordered = Vec::with_capacity(desired.qualities.len());
        for entry in &desired.qualities {
            if entry.is_group() {
                let mut members = Vec::with_capacity(entry.qualities.len());
                for member in &entry.qualities {
                    let quality = self.lookup(desired, member)?;
                    mark_seen(quality.name.as_str(), &mut seen)?;
                    members.push(QualityProfileItem::single(quality.to_quality_info(), entry.enabled));
                }
                let id = match existing_items
                    .iter()
                    .find(|item| item.is_group() && item.name.as_deref() == Some(entry.name.as_str()))
                    .and_then(|item| item.id)
                {
                    Some(id) => id,
                    None => {
                        next_group_id += 1;
                        next_group_id
                    }
                };
                ordered.push(QualityProfileItem::group(id, entry.name.clone(), members, entry.enabled));
            } else {
                let quality = self.lookup(desired, &entry.name)?;
                mark_seen(quality.name.as_str(), &mut seen)?;
                ordered.push(QualityProfileItem::single(quality.to_quality_info(), entry.enabled));
            }
        }

        if desired.quality_sort == QualitySort::Top {
            ordered.reverse();
        }

        let mut items: Vec<QualityProfileItem> = self
            .catalogue
            .iter()
            .filter(|quality| !seen.contains(quality.name.as_str()))
            .map(|quality| QualityProfileItem::single(quality.to_quality_info(), false))
            .collect();
        items.extend(ordered);
        Ok(items)
    }

    fn lookup(
        &self,
        desired: &CanonicalQualityProfile,
        name: &str,
    ) -> SyncResult<&'a QualityCatalogueEntry> {
        self.catalogue
            .iter()
            .find(|quality| quality.name == name)
            .ok_or_else(|| SyncError::UnknownQuality {
                profile: desired.name.clone(),
                quality: name.to_string(),
            })
    }

    /// Desired scores by format name; `None` means no opinion.
    fn desired_scores(&self, desired: &CanonicalQualityProfile) -> BTreeMap<String, Option<i64>> {
        desired
            .score_assignments
            .iter()
            .filter_map(|assignment| {
                let format = self.formats.iter().find(|f| f.trash_id == assignment.trash_id)?;
                let score = resolve_score(
                    desired.score_set.as_deref(),
                    &format.score_sets,
                    assignment.score,
                );
                Some((format.name.clone(), score))
            })
            .collect()
    }

    /// The complete `formatItems` array and the score changes it contains.
    fn score_items(
        &self,
        desired: &CanonicalQualityProfile,
        current: &[ProfileFormatItem],
        scores: &BTreeMap<String, Option<i64>>,
    ) -> (Vec<ProfileFormatItem>, Vec<String>) {
        let reset = &desired.reset_unmatched_scores;
        let target = |name: &str, current_score: i64| match scores.get(name) {
            Some(Some(score)) => *score,
            _ if reset.applies_to(name) => 0,
            _ => current_score,
        };

        let mut changes = Vec::new();
        let mut items = Vec::with_capacity(current.len());
        for item in current {
            let score = target(&item.name, item.score);
            if score != item.score {
                changes.push(format!("score '{}': {} -> {}", item.name, item.score, score));
            }
            items.push(ProfileFormatItem {
                score,
                ..item.clone()
            });
        }

        for name in scores.keys() {
            if current.iter().any(|item| &item.name == name) {
                continue;
            }
            let Some(&format) = self.format_ids.get(name) else {
                debug!(profile = %desired.name, format = %name, "Custom format has no server id yet");
                continue;
            };
            let score = target(name, 0);
            if score != 0 {
                changes.push(format!("score '{}': 0 -> {}", name, score));
            }
            items.push(ProfileFormatItem {
                format,
                name: name.clone(),
                score,
            });
        }

        (items, changes)
    }

    fn build_new(
        &self,
        desired: &CanonicalQualityProfile,
        items: Vec<QualityProfileItem>,
        cutoff: i64,
        scores: &BTreeMap<String, Option<i64>>,
        template: Option<&ServerQualityProfile>,
    ) -> ServerQualityProfile {
        let format_items = self
            .format_ids
            .iter()
            .map(|(name, &format)| ProfileFormatItem {
                format,
                name: name.clone(),
                score: scores.get(name).copied().flatten().unwrap_or(0),
            })
            .collect();

        ServerQualityProfile {
            id: None,
            name: desired.name.clone(),
            upgrade_allowed: desired.upgrade.allowed,
            cutoff,
            items,
            min_format_score: desired.min_format_score.unwrap_or(0),
            cutoff_format_score: desired.upgrade.until_score.unwrap_or(0),
            format_items,
            extra: template.map(|p| p.extra.clone()).unwrap_or_default(),
        }
    }
}

/// Resolves the cutoff against the rebuilt list; without `until_quality` the
/// highest-priority allowed entry is used.
fn resolve_cutoff(desired: &CanonicalQualityProfile, items: &[QualityProfileItem]) -> SyncResult<i64> {
    let unknown = |cutoff: &str| SyncError::UnknownCutoff {
        profile: desired.name.clone(),
        cutoff: cutoff.to_string(),
    };

    match &desired.upgrade.until_quality {
        Some(name) => items
            .iter()
            .find(|item| item.allowed && item.display_name() == name)
            .and_then(QualityProfileItem::cutoff_id)
            .ok_or_else(|| unknown(name)),
        None => items
            .iter()
            .rev()
            .find(|item| item.allowed)
            .and_then(QualityProfileItem::cutoff_id)
            .ok_or_else(|| unknown("<highest allowed quality>")),
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct ItemSignature {
    name: String,
    allowed: bool,
    members: Vec<String>,
}

fn signatures(items: &[QualityProfileItem]) -> Vec<ItemSignature> {
    items
        .iter()
        .map(|item| {
            let mut members: Vec<String> = item
                .items
                .iter()
                .map(|member| member.display_name().to_string())
                .collect();
            members.sort();
            ItemSignature {
                name: item.display_name().to_string(),
                allowed: item.allowed,
                members,
            }
        })
        .collect()
}

/// Two-phase comparison: the set of entries first, then their order.
fn quality_list_change(server: &[QualityProfileItem], desired: &[QualityProfileItem]) -> Option<String> {
    let server_signatures = signatures(server);
    let desired_signatures = signatures(desired);

    let mut server_sorted: Vec<&ItemSignature> = server_signatures.iter().collect();
    let mut desired_sorted: Vec<&ItemSignature> = desired_signatures.iter().collect();
    server_sorted.sort();
    desired_sorted.sort();

    if server_sorted != desired_sorted {
        Some("qualities: entries differ, replacing the quality list".to_string())
    } else if server_signatures != desired_signatures {
        Some("qualities: order differs, replacing the quality list".to_string())
    } else {
        None
    }
}

fn scalar_change<T>(changes: &mut Vec<String>, label: &str, current: &mut T, desired: T)
where
    T: PartialEq + std::fmt::Display,
{
    if *current != desired {
        changes.push(format!("{}: {} -> {}", label, current, desired));
        *current = desired;
    }
}
