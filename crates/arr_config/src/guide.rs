//! Reader for a local checkout of the TRaSH guides.
//!
//! The guide publishes JSON files per application under `docs/json/<arr>/`:
//!
//! ```text
//! docs/json/radarr/
//!     cf/                 custom formats, keyed by `trash_id`
//!     quality-size/       quality size envelopes, keyed by `type`
//!     quality-profiles/   complete quality profiles, keyed by `trash_id`
//! ```
//!
//! Malformed files are logged and skipped so that one broken guide file does not prevent a
//! run. A missing directory is treated as empty.

use crate::input::{
    ArrType, ConfigFragment, CustomFormatAssignment, QualityEntryInput, QualityProfileInput,
    QualitySort, ScoreAssignment, UpgradeInput,
};
use crate::{ConfigurationError, ConfigurationResult};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[cfg(test)]
#[path = "guide_tests.rs"]
mod tests;

/// A custom format as published in the guide (and in local custom-format files).
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GuideCustomFormat {
    pub trash_id: String,
    /// Score per score set; the `default` set applies when a profile names none
    #[serde(default)]
    pub trash_scores: BTreeMap<String, i64>,
    pub name: String,
    #[serde(default, rename = "includeCustomFormatWhenRenaming")]
    pub include_custom_format_when_renaming: bool,
    /// Raw specifications, validated when the catalogue is built
    #[serde(default)]
    pub specifications: Vec<serde_json::Value>,
}

/// Quality size envelopes for one media type.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TrashQualitySize {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub qualities: Vec<TrashQualitySizeEntry>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TrashQualitySizeEntry {
    pub quality: String,
    pub min: f64,
    pub preferred: f64,
    pub max: f64,
}

/// A complete quality profile as published in the guide.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrashQualityProfile {
    #[serde(rename = "trash_id")]
    pub trash_id: String,
    pub name: String,
    #[serde(default, rename = "trash_score_set")]
    pub trash_score_set: Option<String>,
    #[serde(default)]
    pub upgrade_allowed: bool,
    #[serde(default)]
    pub cutoff: Option<String>,
    #[serde(default)]
    pub min_format_score: i64,
    #[serde(default)]
    pub cutoff_format_score: Option<i64>,
    /// Quality items in application order: lowest priority first
    #[serde(default)]
    pub items: Vec<TrashProfileItem>,
    /// Custom format name to trash id
    #[serde(default)]
    pub format_items: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TrashProfileItem {
    pub name: String,
    #[serde(default = "default_allowed")]
    pub allowed: bool,
    #[serde(default)]
    pub items: Vec<String>,
}

fn default_allowed() -> bool {
    true
}

impl TrashQualityProfile {
    /// Converts the profile into a configuration fragment: the profile itself plus one
    /// custom-format block assigning every referenced format to it.
    ///
    /// Items are reversed into top-first order and disallowed items are dropped; the
    /// reconciler appends every unreferenced quality as disabled.
    pub fn to_fragment(&self) -> ConfigFragment {
        let qualities = self
            .items
            .iter()
            .rev()
            .filter(|item| item.allowed)
            .map(|item| QualityEntryInput {
                name: item.name.clone(),
                qualities: item.items.clone(),
                enabled: None,
            })
            .collect();

        let profile = QualityProfileInput {
            name: Some(self.name.clone()),
            qualities: Some(qualities),
            upgrade: Some(UpgradeInput {
                allowed: Some(self.upgrade_allowed),
                until_quality: self.cutoff.clone(),
                until_score: self.cutoff_format_score,
            }),
            min_format_score: Some(self.min_format_score),
            score_set: self.trash_score_set.clone(),
            quality_sort: Some(QualitySort::Top),
            reset_unmatched_scores: None,
        };

        let mut custom_formats = Vec::new();
        if !self.format_items.is_empty() {
            custom_formats.push(CustomFormatAssignment {
                trash_ids: self.format_items.values().cloned().collect(),
                assign_scores_to: vec![ScoreAssignment {
                    name: self.name.clone(),
                    score: None,
                }],
                quality_profiles: None,
            });
        }

        ConfigFragment {
            custom_formats,
            quality_profiles: vec![profile],
            ..ConfigFragment::default()
        }
    }
}

/// Read access to the guide JSON files of one application.
#[derive(Debug, Clone)]
pub struct TrashGuide {
    root: PathBuf,
    arr_type: ArrType,
}

impl TrashGuide {
    /// Creates a reader over the guide checkout at `root`.
    pub fn new(root: impl Into<PathBuf>, arr_type: ArrType) -> Self {
        Self {
            root: root.into(),
            arr_type,
        }
    }

    pub fn arr_type(&self) -> ArrType {
        self.arr_type
    }

    fn json_dir(&self, section: &str) -> PathBuf {
        self.root
            .join("docs")
            .join("json")
            .join(self.arr_type.as_str())
            .join(section)
    }

    /// All custom formats of the application.
    pub fn custom_formats(&self) -> ConfigurationResult<Vec<GuideCustomFormat>> {
        read_custom_formats_dir(&self.json_dir("cf"))
    }

    /// All quality size envelopes of the application.
    pub fn quality_sizes(&self) -> ConfigurationResult<Vec<TrashQualitySize>> {
        read_json_dir(&self.json_dir("quality-size"))
    }

    /// The quality sizes for one media type, e.g. `movie` or `series`.
    pub fn quality_size(&self, kind: &str) -> ConfigurationResult<Option<TrashQualitySize>> {
        Ok(self
            .quality_sizes()?
            .into_iter()
            .find(|size| size.kind.eq_ignore_ascii_case(kind)))
    }

    /// All complete quality profiles of the application.
    pub fn quality_profiles(&self) -> ConfigurationResult<Vec<TrashQualityProfile>> {
        read_json_dir(&self.json_dir("quality-profiles"))
    }

    /// The quality profile with the given trash id.
    pub fn quality_profile(&self, trash_id: &str) -> ConfigurationResult<Option<TrashQualityProfile>> {
        Ok(self
            .quality_profiles()?
            .into_iter()
            .find(|profile| profile.trash_id == trash_id))
    }
}

/// Reads every custom format JSON file in `dir`.
pub fn read_custom_formats_dir(dir: &Path) -> ConfigurationResult<Vec<GuideCustomFormat>> {
    read_json_dir(dir)
}

fn read_json_dir<T: DeserializeOwned>(dir: &Path) -> ConfigurationResult<Vec<T>> {
    if !dir.is_dir() {
        debug!("Guide directory {:?} does not exist", dir);
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(dir).map_err(|e| ConfigurationError::FileAccessError {
        path: dir.display().to_string(),
        reason: e.to_string(),
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    let mut items = Vec::with_capacity(paths.len());
    for path in paths {
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable guide file");
                continue;
            }
        };
        match serde_json::from_str(&content) {
            Ok(item) => items.push(item),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping malformed guide file");
            }
        }
    }

    debug!(count = items.len(), "Read guide files from {:?}", dir);
    Ok(items)
}
