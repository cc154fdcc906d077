//! Desired-state input model.
//!
//! These types mirror the user's YAML configuration file. The same [`ConfigFragment`] shape
//! is used for an instance's inline configuration and for reusable templates, so templates
//! and instance configuration can be merged with one set of rules (see
//! [`crate::merger::TemplateMerger`]).
//!
//! Every field of a fragment is optional: a template may contribute only custom formats,
//! another only a quality definition, and the merge decides the final value.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

#[cfg(test)]
#[path = "input_tests.rs"]
mod tests;

/// Default TRaSH guides repository.
pub const DEFAULT_TRASH_GUIDE_URL: &str = "https://github.com/TRaSH-Guides/Guides";

/// Default recyclarr config templates repository.
pub const DEFAULT_RECYCLARR_CONFIG_URL: &str = "https://github.com/recyclarr/config-templates";

/// Default git revision for both repositories.
pub const DEFAULT_REVISION: &str = "master";

/// The kind of managed application an instance is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrType {
    Sonarr,
    Radarr,
}

impl ArrType {
    /// Lowercase name as used in guide and template directory names.
    pub fn as_str(&self) -> &'static str {
        match self {
            ArrType::Sonarr => "sonarr",
            ArrType::Radarr => "radarr",
        }
    }
}

impl fmt::Display for ArrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Root of the configuration file.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct InputConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trash_guide_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trash_revision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recyclarr_config_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recyclarr_revision: Option<String>,

    /// Directory of additional custom-format JSON files (guide format)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_custom_formats_path: Option<PathBuf>,

    /// Directory of additional reusable YAML templates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_config_templates_path: Option<PathBuf>,

    /// Custom formats defined inline, in guide JSON shape
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_format_definitions: Vec<serde_json::Value>,

    #[serde(default)]
    pub sonarr: BTreeMap<String, InstanceConfig>,

    #[serde(default)]
    pub radarr: BTreeMap<String, InstanceConfig>,
}

impl InputConfig {
    pub fn trash_guide_url(&self) -> &str {
        self.trash_guide_url
            .as_deref()
            .unwrap_or(DEFAULT_TRASH_GUIDE_URL)
    }

    pub fn trash_revision(&self) -> &str {
        self.trash_revision.as_deref().unwrap_or(DEFAULT_REVISION)
    }

    pub fn recyclarr_config_url(&self) -> &str {
        self.recyclarr_config_url
            .as_deref()
            .unwrap_or(DEFAULT_RECYCLARR_CONFIG_URL)
    }

    pub fn recyclarr_revision(&self) -> &str {
        self.recyclarr_revision.as_deref().unwrap_or(DEFAULT_REVISION)
    }

    /// All configured instances: Sonarr instances first, then Radarr, each in name order.
    pub fn instances(&self) -> impl Iterator<Item = (ArrType, &str, &InstanceConfig)> {
        self.sonarr
            .iter()
            .map(|(name, instance)| (ArrType::Sonarr, name.as_str(), instance))
            .chain(
                self.radarr
                    .iter()
                    .map(|(name, instance)| (ArrType::Radarr, name.as_str(), instance)),
            )
    }
}

fn default_enabled() -> bool {
    true
}

/// Configuration of one managed instance.
#[derive(Clone, Deserialize, Serialize, PartialEq)]
pub struct InstanceConfig {
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,

    /// Disabled instances are skipped entirely
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(flatten)]
    pub fragment: ConfigFragment,
}

impl fmt::Debug for InstanceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("enabled", &self.enabled)
            .field("fragment", &self.fragment)
            .finish()
    }
}

/// The mergeable part of an instance configuration; also the shape of a template.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ConfigFragment {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<IncludeEntry>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_formats: Vec<CustomFormatAssignment>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub quality_profiles: Vec<QualityProfileInput>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_definition: Option<QualityDefinitionInput>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_format_definitions: Vec<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_unmanaged_custom_formats: Option<DeleteUnmanagedInput>,
}

/// Namespace an include is resolved in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TemplateSourceKind {
    /// Reusable YAML templates (local directory, then the recyclarr checkout)
    #[default]
    Recyclarr,
    /// TRaSH guide quality profiles, addressed by trash id
    Trash,
}

impl fmt::Display for TemplateSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateSourceKind::Recyclarr => f.write_str("recyclarr"),
            TemplateSourceKind::Trash => f.write_str("trash"),
        }
    }
}

/// One entry of an `include` list.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct IncludeEntry {
    /// Template name, trash id, or HTTP(S) URL
    #[serde(alias = "id")]
    pub template: String,

    #[serde(default)]
    pub source: TemplateSourceKind,
}

impl IncludeEntry {
    pub fn new(template: impl Into<String>, source: TemplateSourceKind) -> Self {
        Self {
            template: template.into(),
            source,
        }
    }

    /// Returns `true` when the template is fetched from an HTTP(S) URL.
    pub fn is_url(&self) -> bool {
        let lower = self.template.to_ascii_lowercase();
        lower.starts_with("http://") || lower.starts_with("https://")
    }
}

/// Selects custom formats by trash id and assigns them to quality profiles.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct CustomFormatAssignment {
    #[serde(default)]
    pub trash_ids: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assign_scores_to: Vec<ScoreAssignment>,

    /// Deprecated spelling of `assign_scores_to`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_profiles: Option<Vec<ScoreAssignment>>,
}

/// Assignment of the selected formats to one profile, with an optional explicit score.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ScoreAssignment {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,
}

/// Sort direction of a profile's quality list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QualitySort {
    /// First listed quality has the highest priority
    #[default]
    Top,
    /// First listed quality has the lowest priority
    Bottom,
}

/// A quality profile as written in configuration or a template.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct QualityProfileInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualities: Option<Vec<QualityEntryInput>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upgrade: Option<UpgradeInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_format_score: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_set: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_sort: Option<QualitySort>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_unmatched_scores: Option<ResetUnmatchedScoresInput>,
}

/// A bare quality (no `qualities`) or a named group of qualities.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct QualityEntryInput {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub qualities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct UpgradeInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until_quality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until_score: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ResetUnmatchedScoresInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Format names whose score is never reset
    #[serde(default, alias = "exceptions", skip_serializing_if = "Option::is_none")]
    pub except: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct QualityDefinitionInput {
    /// Guide quality-size type, e.g. `movie`, `series`, `anime`
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Preferred size position between min and max, in `[0, 1]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_ratio: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct DeleteUnmanagedInput {
    #[serde(default)]
    pub enabled: bool,
    /// Server format names that are never deleted
    #[serde(default)]
    pub ignore: Vec<String>,
}
