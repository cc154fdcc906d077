//! Reconciliation error types.
//!
//! Each variant belongs to one class of failure:
//!
//! - reference errors (`UnknownQuality`, `UnknownCutoff`, `DuplicateQuality`) are fatal for
//!   one quality profile; other profiles are still processed;
//! - remote errors (`Remote`) fail one entity operation; the run continues;
//! - `InvalidRatio` is raised by direct calls to the size interpolation.

use arr_config::ConfigurationError;
use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    #[error("Quality profile '{profile}' references unknown quality '{quality}'")]
    UnknownQuality { profile: String, quality: String },

    #[error("Quality profile '{profile}' has cutoff '{cutoff}' which is not an allowed entry of its quality list")]
    UnknownCutoff { profile: String, cutoff: String },

    #[error("Quality profile '{profile}' lists quality '{quality}' more than once")]
    DuplicateQuality { profile: String, quality: String },

    #[error("Preferred ratio {ratio} is outside [0, 1]")]
    InvalidRatio { ratio: f64 },

    #[error("Failed to {operation} {entity} '{name}': {message}")]
    Remote {
        operation: String,
        entity: String,
        name: String,
        message: String,
    },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
}

impl SyncError {
    /// Wraps a client error raised while applying one entity operation.
    pub fn remote(
        operation: impl Into<String>,
        entity: impl Into<String>,
        name: impl Into<String>,
        error: &arr_client::Error,
    ) -> Self {
        SyncError::Remote {
            operation: operation.into(),
            entity: entity.into(),
            name: name.into(),
            message: error.server_message(),
        }
    }

    /// Returns `true` for errors confined to a single quality profile.
    pub fn is_reference_error(&self) -> bool {
        matches!(
            self,
            SyncError::UnknownQuality { .. }
                | SyncError::UnknownCutoff { .. }
                | SyncError::DuplicateQuality { .. }
        )
    }
}

/// Result type alias for reconciliation operations.
pub type SyncResult<T> = Result<T, SyncError>;
