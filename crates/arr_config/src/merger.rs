//! Template merging engine.
//!
//! This module combines an instance's inline configuration with every template it
//! includes into one [`MergedConfig`].
//!
//! # Merge order
//!
//! Fragments are merged in include order, with nested includes expanded depth-first before
//! the fragment that includes them, and the instance's inline configuration last:
//!
//! ```text
//! include[0] (and its includes) → include[1] → ... → inline configuration
//! ```
//!
//! # Merge rules
//!
//! - `custom_formats` and `custom_format_definitions` are concatenated.
//! - `quality_profiles` with the same `name` merge by shallow override: a later field
//!   replaces an earlier one, except `upgrade` and `reset_unmatched_scores`, which merge
//!   key by key.
//! - `quality_definition` merges key by key; `delete_unmanaged_custom_formats` is replaced
//!   as a whole. The last writer wins in both cases.
//! - The deprecated `quality_profiles` key of a custom-format block is rewritten to
//!   `assign_scores_to`, with one warning per merge.
//! - Profiles without a `name`, `qualities` or `upgrade` block are dropped with a warning.
//!
//! An include that cannot be resolved, or that would include itself, is skipped with a
//! warning.
//!
//! # Examples
//!
//! ```no_run
//! use arr_config::{ConfigFragment, TemplateMerger, TemplateSources};
//!
//! # async fn example(fragment: ConfigFragment) {
//! let sources = TemplateSources::empty();
//! let merged = TemplateMerger::new(&sources).merge(&fragment).await;
//! println!("{} quality profiles", merged.quality_profiles.len());
//! # }
//! ```

use crate::input::{
    ConfigFragment, CustomFormatAssignment, DeleteUnmanagedInput, IncludeEntry,
    QualityDefinitionInput, QualityProfileInput, ResetUnmatchedScoresInput, UpgradeInput,
};
use crate::template_source::TemplateSources;
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, warn};

#[cfg(test)]
#[path = "merger_tests.rs"]
mod tests;

/// The result of merging an instance with its templates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedConfig {
    /// Custom-format blocks in merge order, deprecated keys already rewritten
    pub custom_formats: Vec<CustomFormatAssignment>,
    /// Complete profiles in order of first appearance
    pub quality_profiles: Vec<QualityProfileInput>,
    pub quality_definition: Option<QualityDefinitionInput>,
    pub custom_format_definitions: Vec<serde_json::Value>,
    pub delete_unmanaged_custom_formats: Option<DeleteUnmanagedInput>,
}

impl MergedConfig {
    pub fn profile(&self, name: &str) -> Option<&QualityProfileInput> {
        self.quality_profiles
            .iter()
            .find(|profile| profile.name.as_deref() == Some(name))
    }
}

type FragmentsFuture<'a> = Pin<Box<dyn Future<Output = Vec<ConfigFragment>> + Send + 'a>>;

/// Merges configuration fragments, resolving includes through a [`TemplateSources`] router.
pub struct TemplateMerger<'a> {
    sources: &'a TemplateSources,
}

impl<'a> TemplateMerger<'a> {
    pub fn new(sources: &'a TemplateSources) -> Self {
        Self { sources }
    }

    /// Merges `instance` with every template it includes.
    pub async fn merge(&self, instance: &ConfigFragment) -> MergedConfig {
        let fragments = self.expand(instance.clone(), Vec::new()).await;
        debug!(fragments = fragments.len(), "Merging configuration fragments");
        merge_fragments(fragments)
    }

    /// Flattens a fragment and its includes into merge order.
    fn expand(&self, mut fragment: ConfigFragment, chain: Vec<String>) -> FragmentsFuture<'_> {
        Box::pin(async move {
            let includes = std::mem::take(&mut fragment.include);
            let mut ordered = Vec::new();

            for entry in includes {
                let key = include_key(&entry);
                if chain.contains(&key) {
                    warn!(
                        template = %entry.template,
                        chain = %chain.join(" -> "),
                        "Template includes itself, skipping the cyclic include"
                    );
                    continue;
                }

                match self.sources.resolve(&entry).await {
                    Ok(included) => {
                        debug!(template = %entry.template, source = %entry.source, "Resolved include");
                        let mut nested_chain = chain.clone();
                        nested_chain.push(key);
                        ordered.extend(self.expand(included, nested_chain).await);
                    }
                    Err(e) => {
                        warn!(
                            template = %entry.template,
                            source = %entry.source,
                            error = %e,
                            "Skipping include that could not be resolved"
                        );
                    }
                }
            }

            ordered.push(fragment);
            ordered
        })
    }
}

fn include_key(entry: &IncludeEntry) -> String {
    format!("{}:{}", entry.source, entry.template)
}

/// Merges already-resolved fragments in order. Includes inside the fragments are ignored.
pub fn merge_fragments(fragments: Vec<ConfigFragment>) -> MergedConfig {
    let mut merged = MergedConfig::default();
    let mut profiles: Vec<QualityProfileInput> = Vec::new();
    let mut deprecated_key_used = false;

    for fragment in fragments {
        for mut block in fragment.custom_formats {
            if let Some(legacy) = block.quality_profiles.take() {
                deprecated_key_used = true;
                block.assign_scores_to.extend(legacy);
            }
            merged.custom_formats.push(block);
        }

        for profile in fragment.quality_profiles {
            let Some(name) = profile.name.clone() else {
                warn!("Dropping quality profile without a name");
                continue;
            };
            match profiles
                .iter_mut()
                .find(|existing| existing.name.as_deref() == Some(name.as_str()))
            {
                Some(existing) => merge_profile(existing, profile),
                None => profiles.push(profile),
            }
        }

        if let Some(definition) = fragment.quality_definition {
            let target = merged.quality_definition.get_or_insert_with(Default::default);
            if definition.kind.is_some() {
                target.kind = definition.kind;
            }
            if definition.preferred_ratio.is_some() {
                target.preferred_ratio = definition.preferred_ratio;
            }
        }

        merged
            .custom_format_definitions
            .extend(fragment.custom_format_definitions);

        if fragment.delete_unmanaged_custom_formats.is_some() {
            merged.delete_unmanaged_custom_formats = fragment.delete_unmanaged_custom_formats;
        }
    }

    if deprecated_key_used {
        warn!("The 'quality_profiles' key of custom_formats is deprecated, use 'assign_scores_to'");
    }

    merged.quality_profiles = profiles
        .into_iter()
        .filter(|profile| {
            let name = profile.name.as_deref().unwrap_or_default();
            if profile.qualities.is_none() {
                warn!(profile = name, "Dropping quality profile without 'qualities'");
                return false;
            }
            if profile.upgrade.is_none() {
                warn!(profile = name, "Dropping quality profile without an 'upgrade' block");
                return false;
            }
            true
        })
        .collect();

    merged
}

fn merge_profile(existing: &mut QualityProfileInput, later: QualityProfileInput) {
    if later.qualities.is_some() {
        existing.qualities = later.qualities;
    }
    if later.min_format_score.is_some() {
        existing.min_format_score = later.min_format_score;
    }
    if later.score_set.is_some() {
        existing.score_set = later.score_set;
    }
    if later.quality_sort.is_some() {
        existing.quality_sort = later.quality_sort;
    }
    if let Some(upgrade) = later.upgrade {
        merge_upgrade(existing.upgrade.get_or_insert_with(Default::default), upgrade);
    }
    if let Some(reset) = later.reset_unmatched_scores {
        merge_reset(
            existing.reset_unmatched_scores.get_or_insert_with(Default::default),
            reset,
        );
    }
}

fn merge_upgrade(existing: &mut UpgradeInput, later: UpgradeInput) {
    if later.allowed.is_some() {
        existing.allowed = later.allowed;
    }
    if later.until_quality.is_some() {
        existing.until_quality = later.until_quality;
    }
    if later.until_score.is_some() {
        existing.until_score = later.until_score;
    }
}

fn merge_reset(existing: &mut ResetUnmatchedScoresInput, later: ResetUnmatchedScoresInput) {
    if later.enabled.is_some() {
        existing.enabled = later.enabled;
    }
    if later.except.is_some() {
        existing.except = later.except;
    }
}
