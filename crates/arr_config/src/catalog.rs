//! The custom-format catalogue.
//!
//! Custom-format definitions come from several places. The catalogue reduces them, in
//! order, into one map keyed by trash id; a later definition replaces an earlier one with
//! the same id and the replacement is logged with both origins:
//!
//! 1. the TRaSH guide,
//! 2. JSON files in `local_custom_formats_path`,
//! 3. the global `custom_format_definitions`,
//! 4. the instance's merged `custom_format_definitions`.
//!
//! A definition with an invalid specification is logged and left out of the catalogue.

use crate::canonical::CanonicalCustomFormat;
use crate::guide::{read_custom_formats_dir, GuideCustomFormat, TrashGuide};
use crate::ConfigurationResult;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

#[cfg(test)]
#[path = "catalog_tests.rs"]
mod tests;

#[derive(Debug, Clone)]
struct CatalogEntry {
    format: CanonicalCustomFormat,
    origin: String,
}

/// Every known custom format, keyed by trash id.
#[derive(Debug, Clone, Default)]
pub struct CustomFormatCatalog {
    entries: BTreeMap<String, CatalogEntry>,
}

impl CustomFormatCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the catalogue from its four sources in precedence order.
    ///
    /// # Errors
    ///
    /// Returns an error when a source directory exists but cannot be read.
    pub fn build(
        guide: Option<&TrashGuide>,
        local_custom_formats: Option<&Path>,
        global_definitions: &[Value],
        instance_definitions: &[Value],
    ) -> ConfigurationResult<Self> {
        let mut catalog = Self::new();
        if let Some(guide) = guide {
            catalog.add_formats("trash guide", guide.custom_formats()?);
        }
        if let Some(dir) = local_custom_formats {
            catalog.add_formats(&dir.display().to_string(), read_custom_formats_dir(dir)?);
        }
        catalog.add_definitions("global custom_format_definitions", global_definitions);
        catalog.add_definitions("instance custom_format_definitions", instance_definitions);

        debug!(count = catalog.len(), "Custom format catalogue built");
        Ok(catalog)
    }

    /// Adds formats from one source; later additions replace earlier ones.
    pub fn add_formats(&mut self, origin: &str, formats: Vec<GuideCustomFormat>) {
        for format in formats {
            let trash_id = format.trash_id.clone();
            let canonical = match CanonicalCustomFormat::from_guide(format) {
                Ok(canonical) => canonical,
                Err(e) => {
                    warn!(trash_id = %trash_id, origin = origin, error = %e, "Skipping invalid custom format");
                    continue;
                }
            };

            let entry = CatalogEntry {
                format: canonical,
                origin: origin.to_string(),
            };
            if let Some(previous) = self.entries.insert(trash_id.clone(), entry) {
                warn!(
                    trash_id = %trash_id,
                    name = %previous.format.name,
                    previous_origin = %previous.origin,
                    origin = origin,
                    "Custom format definition overwritten"
                );
            }
        }
    }

    /// Adds formats written inline as guide-shaped JSON values.
    pub fn add_definitions(&mut self, origin: &str, definitions: &[Value]) {
        let formats = definitions
            .iter()
            .filter_map(|value| match serde_json::from_value::<GuideCustomFormat>(value.clone()) {
                Ok(format) => Some(format),
                Err(e) => {
                    warn!(origin = origin, error = %e, "Skipping malformed custom format definition");
                    None
                }
            })
            .collect();
        self.add_formats(origin, formats);
    }

    pub fn get(&self, trash_id: &str) -> Option<&CanonicalCustomFormat> {
        self.entries.get(trash_id).map(|entry| &entry.format)
    }

    /// Where the current definition of `trash_id` came from.
    pub fn origin(&self, trash_id: &str) -> Option<&str> {
        self.entries.get(trash_id).map(|entry| entry.origin.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CanonicalCustomFormat> {
        self.entries.values().map(|entry| &entry.format)
    }
}
