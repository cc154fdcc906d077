//! # Models
//!
//! Wire models for the Sonarr / Radarr v3 REST API.
//!
//! Only the fields this system reads or writes are modelled explicitly. Resources that are
//! read, modified and written back (quality profiles, quality definitions) keep every other
//! key in a flattened map so an update never drops settings the application owns.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[cfg(test)]
#[path = "models_tests.rs"]
mod tests;

/// Basic information about the managed application.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    /// Application name, e.g. `Sonarr` or `Radarr`
    #[serde(default)]
    pub app_name: Option<String>,
    /// Application version string
    pub version: String,
}

/// One `name`/`value` entry of a custom-format specification.
///
/// The application returns additional presentation keys (`label`, `helpText`, `type`, ...)
/// which are kept in `extra` and ignored by the diff.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SpecificationField {
    /// Field name, e.g. `value`, `min`, `max`
    pub name: String,
    /// Field value, type depends on the specification implementation
    #[serde(default)]
    pub value: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SpecificationField {
    /// Creates a field with no presentation metadata.
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
            extra: Map::new(),
        }
    }
}

/// One matching rule of a custom format as exchanged with the application.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpecificationPayload {
    pub name: String,
    pub implementation: String,
    #[serde(default)]
    pub negate: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub fields: Vec<SpecificationField>,
}

/// A custom format as stored on, or sent to, the managed application.
///
/// `id` is absent on create requests and assigned by the server.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CustomFormatPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub include_custom_format_when_renaming: bool,
    #[serde(default)]
    pub specifications: Vec<SpecificationPayload>,
}

/// The quality a definition or profile item refers to.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct QualityInfo {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Size envelope of one quality as stored on the server.
///
/// A `null` maximum or preferred size means "unlimited".
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServerQualityDefinition {
    pub id: i64,
    pub quality: QualityInfo,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub weight: i64,
    #[serde(default)]
    pub min_size: Option<f64>,
    #[serde(default)]
    pub max_size: Option<f64>,
    #[serde(default)]
    pub preferred_size: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ServerQualityDefinition {
    /// Returns `true` when `name` matches the quality name or the display title.
    pub fn matches(&self, name: &str) -> bool {
        self.quality.name == name || self.title == name
    }
}

/// An entry of a quality profile's ordered quality list.
///
/// A single quality carries `quality` and no `items`; a group carries an `id` (groups use
/// ids from 1000 upwards), a `name` and its member `items`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct QualityProfileItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<QualityInfo>,
    #[serde(default)]
    pub items: Vec<QualityProfileItem>,
    #[serde(default)]
    pub allowed: bool,
}

impl QualityProfileItem {
    /// Creates an item for a single quality.
    pub fn single(quality: QualityInfo, allowed: bool) -> Self {
        Self {
            id: None,
            name: None,
            quality: Some(quality),
            items: Vec::new(),
            allowed,
        }
    }

    /// Creates a named group item.
    pub fn group(id: i64, name: impl Into<String>, items: Vec<QualityProfileItem>, allowed: bool) -> Self {
        Self {
            id: Some(id),
            name: Some(name.into()),
            quality: None,
            items,
            allowed,
        }
    }

    /// Returns `true` for a named group of qualities.
    pub fn is_group(&self) -> bool {
        self.quality.is_none()
    }

    /// The name shown for this item: the group name or the quality name.
    pub fn display_name(&self) -> &str {
        match (&self.quality, &self.name) {
            (Some(quality), _) => &quality.name,
            (None, Some(name)) => name,
            (None, None) => "",
        }
    }

    /// The id a profile cutoff uses to reference this item.
    pub fn cutoff_id(&self) -> Option<i64> {
        match &self.quality {
            Some(quality) => Some(quality.id),
            None => self.id,
        }
    }
}

/// The score a profile assigns to one custom format.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ProfileFormatItem {
    /// Custom format id
    pub format: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub score: i64,
}

/// A quality profile as stored on, or sent to, the managed application.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServerQualityProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub upgrade_allowed: bool,
    #[serde(default)]
    pub cutoff: i64,
    #[serde(default)]
    pub items: Vec<QualityProfileItem>,
    #[serde(default)]
    pub min_format_score: i64,
    #[serde(default)]
    pub cutoff_format_score: i64,
    #[serde(default)]
    pub format_items: Vec<ProfileFormatItem>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
