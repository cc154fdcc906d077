//! Configuration system error types.
//!
//! Domain-specific errors for loading the desired-state configuration, reading guide and
//! template sources, and assembling the canonical configuration of an instance.

use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Configuration system errors.
///
/// These errors occur when loading, parsing, or resolving configuration from the various
/// sources (the user's YAML file, the secrets file, guide JSON files, reusable templates,
/// git checkouts and URL templates).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Failed to access configuration file: {path} - {reason}")]
    FileAccessError { path: String, reason: String },

    #[error("Failed to parse configuration: {reason}")]
    ParseError { reason: String },

    #[error("Invalid configuration: {field} - {reason}")]
    InvalidConfiguration { field: String, reason: String },

    #[error("Required configuration missing: {key}")]
    RequiredConfigMissing { key: String },

    #[error("Unresolved {kind} reference '{name}'")]
    UnresolvedReference { kind: String, name: String },

    #[error("Invalid custom format specification in '{format}': {reason}")]
    InvalidSpecification { format: String, reason: String },

    #[error("Template '{name}' not found in {source_kind} templates")]
    TemplateNotFound { name: String, source_kind: String },

    #[error("Failed to fetch template '{name}': {reason}")]
    TemplateFetchFailed { name: String, reason: String },

    #[error("Git operation on '{repository}' failed: {reason}")]
    GitOperationFailed { repository: String, reason: String },
}

impl ConfigurationError {
    /// Returns `true` when the error means "no such template" rather than a failure to
    /// read one that exists.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ConfigurationError::TemplateNotFound { .. })
    }
}

/// Result type alias for configuration operations.
pub type ConfigurationResult<T> = Result<T, ConfigurationError>;
