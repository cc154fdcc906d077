use arr_config::ConfigurationError;
use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors that can occur in the arr-sync CLI application.
///
/// Failures confined to one instance are reported per instance and do not stop the run;
/// the variants here are the ones that make a whole command fail or skip an instance.
#[derive(Error, Debug)]
pub enum Error {
    /// The desired-state configuration could not be loaded or assembled.
    ///
    /// Covers unreadable files, invalid YAML, unresolved `!secret` / `!env` references,
    /// missing connection settings and failed git checkouts.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigurationError),

    /// A client for a managed instance could not be created.
    ///
    /// This usually means the configured `base_url` is not a valid URL.
    #[error("Client error: {0}")]
    Client(#[from] arr_client::Error),

    /// A blocking background task did not complete.
    ///
    /// Returned when a git checkout task panicked or was cancelled.
    #[error("Background task failed: {0}")]
    Task(String),
}
