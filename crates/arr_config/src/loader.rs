//! Loading of the configuration and secrets files.
//!
//! The configuration file is YAML. Two custom tags are resolved before the document is
//! deserialized into [`InputConfig`]:
//!
//! - `!secret NAME` is replaced by the value of `NAME` in the secrets file, a flat YAML map
//!   of names to values.
//! - `!env NAME` is replaced by the value of the environment variable `NAME`.
//!
//! A reference that cannot be resolved is a fatal configuration error; a run with a missing
//! API key would otherwise fail later with a less helpful message.
//!
//! # Examples
//!
//! ```no_run
//! use arr_config::load_input_config;
//! use std::path::Path;
//!
//! let config = load_input_config(
//!     Path::new("/config/config.yml"),
//!     Some(Path::new("/config/secrets.yml")),
//! )?;
//! for (arr_type, name, _) in config.instances() {
//!     println!("{arr_type}: {name}");
//! }
//! # Ok::<(), arr_config::ConfigurationError>(())
//! ```

use crate::{ConfigurationError, ConfigurationResult, InputConfig};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;

/// Secret values keyed by name.
pub type Secrets = BTreeMap<String, String>;

/// Loads the configuration file, resolving `!secret` and `!env` tags.
///
/// # Arguments
///
/// * `path` - Path of the YAML configuration file
/// * `secrets_path` - Optional path of the secrets file. A missing secrets file is only an
///   error when the configuration actually references a secret.
///
/// # Errors
///
/// * `ConfigurationError::FileNotFound` - The configuration file does not exist
/// * `ConfigurationError::FileAccessError` - A file exists but cannot be read
/// * `ConfigurationError::ParseError` - Invalid YAML or a document that does not match the
///   expected structure
/// * `ConfigurationError::UnresolvedReference` - A `!secret` or `!env` tag cannot be resolved
pub fn load_input_config(
    path: &Path,
    secrets_path: Option<&Path>,
) -> ConfigurationResult<InputConfig> {
    debug!("Loading configuration from {:?}", path);
    let content = read_file(path)?;

    let secrets = match secrets_path {
        Some(secrets_path) if secrets_path.exists() => load_secrets(secrets_path)?,
        Some(secrets_path) => {
            debug!("Secrets file {:?} does not exist, continuing without secrets", secrets_path);
            Secrets::new()
        }
        None => Secrets::new(),
    };

    let config = parse_input_config(&content, &secrets, |name| std::env::var(name).ok())?;
    info!(
        sonarr_instances = config.sonarr.len(),
        radarr_instances = config.radarr.len(),
        "Configuration loaded"
    );
    Ok(config)
}

/// Loads a secrets file: a flat YAML map of names to scalar values.
pub fn load_secrets(path: &Path) -> ConfigurationResult<Secrets> {
    let content = read_file(path)?;
    if content.trim().is_empty() {
        return Ok(Secrets::new());
    }

    let raw: BTreeMap<String, Value> =
        serde_yaml::from_str(&content).map_err(|e| ConfigurationError::ParseError {
            reason: format!("secrets file {}: {}", path.display(), e),
        })?;

    raw.into_iter()
        .map(|(name, value)| match scalar_to_string(&value) {
            Some(text) => Ok((name, text)),
            None => Err(ConfigurationError::InvalidConfiguration {
                field: name,
                reason: "secret values must be scalars".to_string(),
            }),
        })
        .collect()
}

/// Parses configuration text, resolving tags with the given secrets and environment lookup.
pub fn parse_input_config<F>(
    content: &str,
    secrets: &Secrets,
    env_lookup: F,
) -> ConfigurationResult<InputConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let document: Value = serde_yaml::from_str(content).map_err(|e| ConfigurationError::ParseError {
        reason: e.to_string(),
    })?;
    let resolved = resolve_tags(document, secrets, &env_lookup)?;

    serde_yaml::from_value(resolved).map_err(|e| ConfigurationError::ParseError {
        reason: e.to_string(),
    })
}

fn resolve_tags<F>(value: Value, secrets: &Secrets, env_lookup: &F) -> ConfigurationResult<Value>
where
    F: Fn(&str) -> Option<String>,
{
    match value {
        Value::Tagged(tagged) => {
            let tag = tagged.tag.to_string();
            let name = scalar_to_string(&tagged.value).ok_or_else(|| {
                ConfigurationError::InvalidConfiguration {
                    field: tag.clone(),
                    reason: "tag value must be a scalar name".to_string(),
                }
            })?;

            match tag.trim_start_matches('!') {
                "secret" => secrets.get(&name).map(|v| Value::String(v.clone())).ok_or(
                    ConfigurationError::UnresolvedReference {
                        kind: "secret".to_string(),
                        name,
                    },
                ),
                "env" => env_lookup(&name).map(Value::String).ok_or(
                    ConfigurationError::UnresolvedReference {
                        kind: "environment variable".to_string(),
                        name,
                    },
                ),
                other => Err(ConfigurationError::InvalidConfiguration {
                    field: name,
                    reason: format!("unsupported tag '!{other}'"),
                }),
            }
        }
        Value::Mapping(mapping) => {
            let mut resolved = serde_yaml::Mapping::with_capacity(mapping.len());
            for (key, value) in mapping {
                resolved.insert(key, resolve_tags(value, secrets, env_lookup)?);
            }
            Ok(Value::Mapping(resolved))
        }
        Value::Sequence(items) => items
            .into_iter()
            .map(|item| resolve_tags(item, secrets, env_lookup))
            .collect::<ConfigurationResult<Vec<_>>>()
            .map(Value::Sequence),
        other => Ok(other),
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn read_file(path: &Path) -> ConfigurationResult<String> {
    if !path.exists() {
        return Err(ConfigurationError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    fs::read_to_string(path).map_err(|e| ConfigurationError::FileAccessError {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}
