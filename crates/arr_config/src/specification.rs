//! Custom-format specifications.
//!
//! A specification is one matching rule of a custom format. Its `fields` depend on the
//! `implementation`, so they are modelled as a tagged union with one typed record per
//! implementation instead of an untyped map.
//!
//! Guide files write `fields` as an object (`{"value": "\\bx265\\b"}`); definitions exported
//! from the application write it as a list of `{name, value}` entries. Both shapes are
//! accepted.

use crate::{ConfigurationError, ConfigurationResult};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

#[cfg(test)]
#[path = "specification_tests.rs"]
mod tests;

/// One matching rule of a custom format.
#[derive(Debug, Clone, PartialEq)]
pub struct Specification {
    pub name: String,
    pub negate: bool,
    pub required: bool,
    pub fields: SpecificationFields,
}

/// Typed field record of a specification, keyed by implementation.
#[derive(Debug, Clone, PartialEq)]
pub enum SpecificationFields {
    ReleaseTitle(PatternFields),
    ReleaseGroup(PatternFields),
    Edition(PatternFields),
    Language(LanguageFields),
    Source(ValueFields),
    Resolution(ValueFields),
    QualityModifier(ValueFields),
    IndexerFlag(ValueFields),
    ReleaseType(ValueFields),
    Size(SizeFields),
    Year(YearFields),
}

/// A regular expression matched against part of the release.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PatternFields {
    pub value: String,
}

/// An enumeration value of the managed application (source, resolution, flag, ...).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ValueFields {
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageFields {
    pub value: i64,
    #[serde(default)]
    pub except_language: Option<bool>,
}

/// Release size bounds in GB.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SizeFields {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct YearFields {
    pub min: i64,
    pub max: i64,
}

#[derive(Deserialize)]
struct RawSpecification {
    #[serde(default)]
    name: String,
    implementation: String,
    #[serde(default)]
    negate: bool,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    fields: Option<Value>,
}

impl Specification {
    /// Parses a specification of the custom format `format`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidSpecification` when the implementation is unknown,
    /// the field set is missing or empty, or a field has the wrong type.
    pub fn from_json(format: &str, value: &Value) -> ConfigurationResult<Self> {
        let invalid = |reason: String| ConfigurationError::InvalidSpecification {
            format: format.to_string(),
            reason,
        };

        let raw: RawSpecification =
            serde_json::from_value(value.clone()).map_err(|e| invalid(e.to_string()))?;

        let fields = match raw.fields {
            Some(fields) => normalize_fields(fields).map_err(&invalid)?,
            None => Map::new(),
        };
        if fields.is_empty() {
            return Err(invalid(format!(
                "specification '{}' has no fields",
                raw.name
            )));
        }

        let fields = SpecificationFields::parse(&raw.implementation, fields)
            .map_err(|reason| invalid(format!("specification '{}': {}", raw.name, reason)))?;

        Ok(Self {
            name: raw.name,
            negate: raw.negate,
            required: raw.required,
            fields,
        })
    }

    /// The application's implementation name, e.g. `ReleaseTitleSpecification`.
    pub fn implementation(&self) -> &'static str {
        self.fields.implementation()
    }
}

impl SpecificationFields {
    fn parse(implementation: &str, fields: Map<String, Value>) -> Result<Self, String> {
        let parsed = match implementation {
            "ReleaseTitleSpecification" => Self::ReleaseTitle(typed(fields)?),
            "ReleaseGroupSpecification" => Self::ReleaseGroup(typed(fields)?),
            "EditionSpecification" => Self::Edition(typed(fields)?),
            "LanguageSpecification" => Self::Language(typed(fields)?),
            "SourceSpecification" => Self::Source(typed(fields)?),
            "ResolutionSpecification" => Self::Resolution(typed(fields)?),
            "QualityModifierSpecification" => Self::QualityModifier(typed(fields)?),
            "IndexerFlagSpecification" => Self::IndexerFlag(typed(fields)?),
            "ReleaseTypeSpecification" => Self::ReleaseType(typed(fields)?),
            "SizeSpecification" => Self::Size(typed(fields)?),
            "YearSpecification" => Self::Year(typed(fields)?),
            other => return Err(format!("unknown implementation '{other}'")),
        };
        Ok(parsed)
    }

    pub fn implementation(&self) -> &'static str {
        match self {
            Self::ReleaseTitle(_) => "ReleaseTitleSpecification",
            Self::ReleaseGroup(_) => "ReleaseGroupSpecification",
            Self::Edition(_) => "EditionSpecification",
            Self::Language(_) => "LanguageSpecification",
            Self::Source(_) => "SourceSpecification",
            Self::Resolution(_) => "ResolutionSpecification",
            Self::QualityModifier(_) => "QualityModifierSpecification",
            Self::IndexerFlag(_) => "IndexerFlagSpecification",
            Self::ReleaseType(_) => "ReleaseTypeSpecification",
            Self::Size(_) => "SizeSpecification",
            Self::Year(_) => "YearSpecification",
        }
    }

    /// The `name`/`value` pairs sent to the application, in a stable order.
    pub fn to_fields(&self) -> Vec<(String, Value)> {
        let pair = |name: &str, value: Value| (name.to_string(), value);
        match self {
            Self::ReleaseTitle(f) | Self::ReleaseGroup(f) | Self::Edition(f) => {
                vec![pair("value", Value::from(f.value.clone()))]
            }
            Self::Language(f) => {
                let mut fields = vec![pair("value", Value::from(f.value))];
                if let Some(except) = f.except_language {
                    fields.push(pair("exceptLanguage", Value::from(except)));
                }
                fields
            }
            Self::Source(f)
            | Self::Resolution(f)
            | Self::QualityModifier(f)
            | Self::IndexerFlag(f)
            | Self::ReleaseType(f) => vec![pair("value", Value::from(f.value))],
            Self::Size(f) => vec![pair("min", Value::from(f.min)), pair("max", Value::from(f.max))],
            Self::Year(f) => vec![pair("min", Value::from(f.min)), pair("max", Value::from(f.max))],
        }
    }
}

fn typed<T: DeserializeOwned>(fields: Map<String, Value>) -> Result<T, String> {
    serde_json::from_value(Value::Object(fields)).map_err(|e| e.to_string())
}

fn normalize_fields(fields: Value) -> Result<Map<String, Value>, String> {
    match fields {
        Value::Object(map) => Ok(map),
        Value::Array(entries) => entries
            .into_iter()
            .map(|entry| {
                let name = entry
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| "field entry without a name".to_string())?
                    .to_string();
                let value = entry.get("value").cloned().unwrap_or(Value::Null);
                Ok((name, value))
            })
            .collect(),
        Value::Null => Ok(Map::new()),
        other => Err(format!("fields must be an object or a list, found {other}")),
    }
}
