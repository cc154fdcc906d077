//! Test helpers shared by the unit tests of this crate.

use crate::input::{ConfigFragment, TemplateSourceKind};
use crate::template_source::TemplateSource;
use crate::{ConfigurationError, ConfigurationResult};
use async_trait::async_trait;
use std::collections::HashMap;

/// An in-memory template source parsed from YAML snippets.
#[derive(Debug, Default)]
pub(crate) struct StaticTemplateSource {
    templates: HashMap<String, ConfigFragment>,
}

impl StaticTemplateSource {
    pub(crate) fn with(mut self, name: &str, yaml: &str) -> Self {
        let fragment: ConfigFragment = serde_yaml::from_str(yaml).expect("invalid test template");
        self.templates.insert(name.to_string(), fragment);
        self
    }
}

#[async_trait]
impl TemplateSource for StaticTemplateSource {
    async fn load(&self, name: &str) -> ConfigurationResult<ConfigFragment> {
        self.templates
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigurationError::TemplateNotFound {
                name: name.to_string(),
                source_kind: TemplateSourceKind::Recyclarr.to_string(),
            })
    }
}
