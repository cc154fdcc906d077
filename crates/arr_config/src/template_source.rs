//! Template sources.
//!
//! An `include` entry names a reusable configuration fragment. Fragments come from three
//! namespaces:
//!
//! - reusable YAML templates, looked up by file name in the local templates directory and
//!   then in the recyclarr config-templates checkout ([`FilesystemTemplateSource`]);
//! - TRaSH guide quality profiles, looked up by trash id ([`GuideProfileSource`]);
//! - ad-hoc templates fetched from an HTTP(S) URL ([`HttpTemplateSource`]).
//!
//! [`TemplateSources`] routes an [`IncludeEntry`] to the right namespace.
//!
//! # Architecture
//!
//! ```text
//! TemplateMerger
//!     ↓ uses
//! TemplateSources
//!     ↓ routes to (abstraction)
//! TemplateSource trait
//!     ↑ implemented by
//! FilesystemTemplateSource, GuideProfileSource, HttpTemplateSource
//! ```

use crate::guide::{TrashGuide, TrashQualityProfile};
use crate::input::{ArrType, ConfigFragment, IncludeEntry, TemplateSourceKind};
use crate::{ConfigurationError, ConfigurationResult};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_yaml::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

#[cfg(test)]
#[path = "template_source_tests.rs"]
mod tests;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Keys of a recyclarr instance that are not part of the mergeable fragment.
const INSTANCE_ONLY_KEYS: [&str; 3] = ["base_url", "api_key", "enabled"];

/// Loads named configuration fragments from one origin.
#[async_trait]
pub trait TemplateSource: Send + Sync {
    /// Loads the fragment called `name`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::TemplateNotFound` when this source has no such template,
    /// and other errors when the template exists but cannot be read or parsed.
    async fn load(&self, name: &str) -> ConfigurationResult<ConfigFragment>;
}

/// Parses a YAML fragment.
///
/// Recyclarr templates nest the fragment in an instance map under the application key
/// (`radarr: { <instance>: { ... } }`); such documents are unwrapped to the first instance.
pub fn parse_yaml_fragment(
    name: &str,
    content: &str,
    arr_type: ArrType,
) -> ConfigurationResult<ConfigFragment> {
    let parse_error = |reason: String| ConfigurationError::ParseError {
        reason: format!("template '{}': {}", name, reason),
    };

    let document: Value = serde_yaml::from_str(content).map_err(|e| parse_error(e.to_string()))?;
    let mut fragment = match document {
        Value::Null => return Ok(ConfigFragment::default()),
        Value::Mapping(mapping) => mapping,
        _ => return Err(parse_error("expected a mapping".to_string())),
    };

    if let Some(Value::Mapping(instances)) = fragment.get(arr_type.as_str()).cloned() {
        if instances.len() > 1 {
            debug!(
                template = name,
                instances = instances.len(),
                "Template defines several instances, using the first"
            );
        }
        if let Some((_, Value::Mapping(instance))) = instances.into_iter().next() {
            fragment = instance;
        }
    }

    for key in INSTANCE_ONLY_KEYS {
        fragment.remove(key);
    }

    serde_yaml::from_value(Value::Mapping(fragment)).map_err(|e| parse_error(e.to_string()))
}

/// Reusable YAML templates stored as `<name>.yml` or `<name>.yaml` below one or more
/// directories. Directories are searched recursively and in order.
#[derive(Debug, Clone)]
pub struct FilesystemTemplateSource {
    roots: Vec<PathBuf>,
    arr_type: ArrType,
}

impl FilesystemTemplateSource {
    pub fn new(roots: Vec<PathBuf>, arr_type: ArrType) -> Self {
        Self { roots, arr_type }
    }

    /// The `includes` and `templates` directories of a recyclarr config-templates checkout.
    pub fn recyclarr(checkout: &Path, arr_type: ArrType) -> Self {
        let base = checkout.join(arr_type.as_str());
        Self::new(vec![base.join("includes"), base.join("templates")], arr_type)
    }

    fn find(&self, name: &str) -> Option<PathBuf> {
        self.roots
            .iter()
            .filter(|root| root.is_dir())
            .find_map(|root| find_template_file(root, name))
    }
}

fn find_template_file(dir: &Path, name: &str) -> Option<PathBuf> {
    let entries = fs::read_dir(dir).ok()?;
    let mut subdirs = Vec::new();
    let mut paths: Vec<PathBuf> = entries.filter_map(|e| e.ok().map(|e| e.path())).collect();
    paths.sort();

    for path in paths {
        if path.is_dir() {
            subdirs.push(path);
            continue;
        }
        let is_yaml = path
            .extension()
            .is_some_and(|ext| ext == "yml" || ext == "yaml");
        if is_yaml && path.file_stem().is_some_and(|stem| stem == name) {
            return Some(path);
        }
    }

    subdirs.iter().find_map(|sub| find_template_file(sub, name))
}

#[async_trait]
impl TemplateSource for FilesystemTemplateSource {
    async fn load(&self, name: &str) -> ConfigurationResult<ConfigFragment> {
        let path = self
            .find(name)
            .ok_or_else(|| ConfigurationError::TemplateNotFound {
                name: name.to_string(),
                source_kind: TemplateSourceKind::Recyclarr.to_string(),
            })?;

        debug!("Loading template '{}' from {:?}", name, path);
        let content = fs::read_to_string(&path).map_err(|e| ConfigurationError::FileAccessError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        parse_yaml_fragment(name, &content, self.arr_type)
    }
}

/// TRaSH guide quality profiles addressed by trash id.
#[derive(Debug, Clone)]
pub struct GuideProfileSource {
    guide: TrashGuide,
}

impl GuideProfileSource {
    pub fn new(guide: TrashGuide) -> Self {
        Self { guide }
    }
}

#[async_trait]
impl TemplateSource for GuideProfileSource {
    async fn load(&self, name: &str) -> ConfigurationResult<ConfigFragment> {
        match self.guide.quality_profile(name)? {
            Some(profile) => Ok(profile.to_fragment()),
            None => Err(ConfigurationError::TemplateNotFound {
                name: name.to_string(),
                source_kind: TemplateSourceKind::Trash.to_string(),
            }),
        }
    }
}

/// Templates fetched from an HTTP(S) URL.
#[derive(Debug, Clone)]
pub struct HttpTemplateSource {
    client: Client,
    arr_type: ArrType,
}

impl HttpTemplateSource {
    pub fn new(arr_type: ArrType) -> ConfigurationResult<Self> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| ConfigurationError::InvalidConfiguration {
                field: "http_client".to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self { client, arr_type })
    }

    /// Fetches `url` and parses it as YAML, or as a TRaSH quality profile JSON document
    /// when `kind` is [`TemplateSourceKind::Trash`].
    pub async fn load_as(
        &self,
        url: &str,
        kind: TemplateSourceKind,
    ) -> ConfigurationResult<ConfigFragment> {
        let fetch_failed = |reason: String| ConfigurationError::TemplateFetchFailed {
            name: url.to_string(),
            reason,
        };

        debug!("Fetching template from {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_failed(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ConfigurationError::TemplateNotFound {
                name: url.to_string(),
                source_kind: "url".to_string(),
            });
        }
        if !status.is_success() {
            warn!(url = url, status = status.as_u16(), "Template fetch failed");
            return Err(fetch_failed(format!("HTTP status {}", status)));
        }

        let body = response.text().await.map_err(|e| fetch_failed(e.to_string()))?;

        match kind {
            TemplateSourceKind::Trash => {
                let profile: TrashQualityProfile =
                    serde_json::from_str(&body).map_err(|e| ConfigurationError::ParseError {
                        reason: format!("template '{}': {}", url, e),
                    })?;
                Ok(profile.to_fragment())
            }
            TemplateSourceKind::Recyclarr => parse_yaml_fragment(url, &body, self.arr_type),
        }
    }
}

#[async_trait]
impl TemplateSource for HttpTemplateSource {
    async fn load(&self, name: &str) -> ConfigurationResult<ConfigFragment> {
        self.load_as(name, TemplateSourceKind::Recyclarr).await
    }
}

/// Routes include entries to the namespace that resolves them.
///
/// URLs are fetched over HTTP regardless of `source`; `TRASH` entries are guide quality
/// profiles; everything else is looked up in the reusable sources in order.
pub struct TemplateSources {
    reusable: Vec<Box<dyn TemplateSource>>,
    trash: Option<Box<dyn TemplateSource>>,
    http: Option<HttpTemplateSource>,
}

impl TemplateSources {
    /// Creates a router with no sources; every include is reported as not found.
    pub fn empty() -> Self {
        Self {
            reusable: Vec::new(),
            trash: None,
            http: None,
        }
    }

    /// Adds a reusable template source, searched after those added before it.
    pub fn with_reusable(mut self, source: Box<dyn TemplateSource>) -> Self {
        self.reusable.push(source);
        self
    }

    pub fn with_trash(mut self, source: Box<dyn TemplateSource>) -> Self {
        self.trash = Some(source);
        self
    }

    pub fn with_http(mut self, source: HttpTemplateSource) -> Self {
        self.http = Some(source);
        self
    }

    /// The standard routing for one application: local templates directory, recyclarr
    /// checkout, guide quality profiles and HTTP.
    pub fn standard(
        arr_type: ArrType,
        local_templates: Option<&Path>,
        recyclarr_checkout: Option<&Path>,
        guide_checkout: Option<&Path>,
    ) -> ConfigurationResult<Self> {
        let mut sources = Self::empty().with_http(HttpTemplateSource::new(arr_type)?);
        if let Some(dir) = local_templates {
            sources = sources.with_reusable(Box::new(FilesystemTemplateSource::new(
                vec![dir.to_path_buf()],
                arr_type,
            )));
        }
        if let Some(checkout) = recyclarr_checkout {
            sources = sources.with_reusable(Box::new(FilesystemTemplateSource::recyclarr(
                checkout, arr_type,
            )));
        }
        if let Some(checkout) = guide_checkout {
            sources = sources.with_trash(Box::new(GuideProfileSource::new(TrashGuide::new(
                checkout, arr_type,
            ))));
        }
        Ok(sources)
    }

    /// Loads the fragment an include entry refers to.
    pub async fn resolve(&self, entry: &IncludeEntry) -> ConfigurationResult<ConfigFragment> {
        if entry.is_url() {
            return match &self.http {
                Some(http) => http.load_as(&entry.template, entry.source).await,
                None => Err(not_found(entry, "url")),
            };
        }

        match entry.source {
            TemplateSourceKind::Trash => match &self.trash {
                Some(source) => source.load(&entry.template).await,
                None => Err(not_found(entry, "trash")),
            },
            TemplateSourceKind::Recyclarr => {
                for source in &self.reusable {
                    match source.load(&entry.template).await {
                        Err(e) if e.is_not_found() => continue,
                        result => return result,
                    }
                }
                Err(not_found(entry, "recyclarr"))
            }
        }
    }
}

impl Default for TemplateSources {
    fn default() -> Self {
        Self::empty()
    }
}

fn not_found(entry: &IncludeEntry, source_kind: &str) -> ConfigurationError {
    ConfigurationError::TemplateNotFound {
        name: entry.template.clone(),
        source_kind: source_kind.to_string(),
    }
}
