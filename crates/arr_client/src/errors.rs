//! Error types for managed-application client operations.
//!
//! This module defines the error types that can occur when talking to the REST API of a
//! Sonarr or Radarr instance through the arr_client crate. Server-side rejections keep the
//! message the application returned so it can be surfaced in the run report.

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors that can occur during managed-application client operations.
///
/// ## Examples
///
/// ```rust,ignore
/// use arr_client::Error;
///
/// match client.create_custom_format(&payload).await {
///     Ok(created) => println!("Custom format created with id {:?}", created.id),
///     Err(Error::Api { status, message, .. }) => eprintln!("Rejected ({status}): {message}"),
///     Err(err) => eprintln!("Other error: {err}"),
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The managed application rejected the request.
    ///
    /// The `message` is extracted from the response body (validation failures, a `message`
    /// field, or the raw text) so that it can be reported to the user verbatim.
    #[error("API request to '{path}' failed with status {status}: {message}")]
    Api {
        status: u16,
        path: String,
        message: String,
    },

    /// Error deserializing the response from the managed application.
    ///
    /// This usually indicates an API version the client does not understand.
    #[error("Failed to deserialize response: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// The transport failed before a response was received.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The configured base URL cannot be used to build request URLs.
    #[error("Invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// The requested resource was not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// The API key was rejected.
    ///
    /// Returned for `401 Unauthorized` responses. Check the `api_key` configured for the
    /// instance.
    #[error("The API key was rejected by the server")]
    Unauthorized,
}

impl Error {
    /// Returns the message the server provided, or the error's display text for
    /// transport-level failures.
    pub fn server_message(&self) -> String {
        match self {
            Error::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Extracts a human readable message from an error response body.
///
/// Sonarr and Radarr report validation failures as a JSON array of objects carrying an
/// `errorMessage`, and other failures as an object with a `message` field. Anything else is
/// returned as trimmed text.
pub(crate) fn extract_error_message(body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::Array(entries)) => {
            let messages: Vec<String> = entries
                .iter()
                .filter_map(|entry| entry.get("errorMessage").and_then(|m| m.as_str()))
                .map(str::to_string)
                .collect();
            if messages.is_empty() {
                body.trim().to_string()
            } else {
                messages.join("; ")
            }
        }
        Ok(serde_json::Value::Object(map)) => map
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| body.trim().to_string()),
        _ => body.trim().to_string(),
    }
}
