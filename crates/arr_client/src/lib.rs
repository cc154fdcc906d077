//! Crate for interacting with the Sonarr / Radarr v3 REST API.
//!
//! This crate provides the [`ArrClient`] abstraction over the handful of endpoints the
//! reconciliation engine consumes (custom formats, quality definitions, quality profiles) and
//! [`ArrHttpClient`], an implementation that talks to a live instance authenticated with its
//! API key.
//!
//! A client is bound to exactly one managed instance. Callers create one client per
//! instance and pass it explicitly to whatever needs it.

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tracing::{debug, error, instrument};
use url::Url;

pub mod errors;
pub use errors::Error;

pub mod models;
pub use models::{
    CustomFormatPayload, ProfileFormatItem, QualityInfo, QualityProfileItem, ServerQualityDefinition,
    ServerQualityProfile, SpecificationField, SpecificationPayload, SystemStatus,
};

// Reference the tests module in the separate file
#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// Header carrying the API key on every request.
const API_KEY_HEADER: &str = "X-Api-Key";

/// Path prefix of the v3 API shared by Sonarr and Radarr.
const API_PREFIX: &str = "api/v3/";

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Operations the reconciliation engine performs against a managed application.
///
/// Implementations must be thread-safe (`Send + Sync`) so a client can be shared by
/// reference across the stages of a run.
#[async_trait]
pub trait ArrClient: Send + Sync {
    /// Reads the application name and version. Used as a connectivity check.
    async fn system_status(&self) -> Result<SystemStatus, Error>;

    /// Lists every custom format defined on the server.
    async fn list_custom_formats(&self) -> Result<Vec<CustomFormatPayload>, Error>;

    /// Creates a custom format and returns it with its server-assigned id.
    async fn create_custom_format(
        &self,
        format: &CustomFormatPayload,
    ) -> Result<CustomFormatPayload, Error>;

    /// Replaces the custom format identified by `format.id`.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` when the payload has no id.
    async fn update_custom_format(
        &self,
        format: &CustomFormatPayload,
    ) -> Result<CustomFormatPayload, Error>;

    /// Deletes the custom format with the given id.
    async fn delete_custom_format(&self, id: i64) -> Result<(), Error>;

    /// Lists the size definitions of every quality known to the server.
    async fn list_quality_definitions(&self) -> Result<Vec<ServerQualityDefinition>, Error>;

    /// Replaces all quality definitions in one bulk request.
    async fn update_quality_definitions(
        &self,
        definitions: &[ServerQualityDefinition],
    ) -> Result<Vec<ServerQualityDefinition>, Error>;

    /// Lists every quality profile.
    async fn list_quality_profiles(&self) -> Result<Vec<ServerQualityProfile>, Error>;

    /// Creates a quality profile and returns it with its server-assigned id.
    async fn create_quality_profile(
        &self,
        profile: &ServerQualityProfile,
    ) -> Result<ServerQualityProfile, Error>;

    /// Replaces the quality profile identified by `profile.id`.
    async fn update_quality_profile(
        &self,
        profile: &ServerQualityProfile,
    ) -> Result<ServerQualityProfile, Error>;
}

/// A client for one Sonarr or Radarr instance, authenticated with an API key.
pub struct ArrHttpClient {
    client: Client,
    base_url: Url,
    api_key: SecretString,
}

impl std::fmt::Debug for ArrHttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArrHttpClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl ArrHttpClient {
    /// Creates a new client for the instance at `base_url`.
    ///
    /// A base URL with a path (e.g. `http://host/sonarr`) is kept; API paths are appended to
    /// it.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidBaseUrl` when `base_url` cannot be parsed, and `Error::Http`
    /// when the HTTP client cannot be constructed.
    ///
    /// # Example
    ///
    /// ```rust
    /// use arr_client::ArrHttpClient;
    /// use secrecy::SecretString;
    ///
    /// let client = ArrHttpClient::new(
    ///     "http://localhost:8989/sonarr",
    ///     SecretString::from("0123456789abcdef".to_string()),
    /// )
    /// .expect("valid base url");
    /// assert_eq!(client.base_url().as_str(), "http://localhost:8989/sonarr/");
    /// ```
    pub fn new(base_url: &str, api_key: SecretString) -> Result<Self, Error> {
        let mut normalized = base_url.trim().to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }

        let base_url = Url::parse(&normalized).map_err(|e| Error::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(Error::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: "URL cannot be used as a base".to_string(),
            });
        }

        let client = Client::builder().timeout(DEFAULT_TIMEOUT).build()?;

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    /// The normalized base URL of the instance.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, resource: &str) -> Result<Url, Error> {
        self.base_url
            .join(&format!("{API_PREFIX}{resource}"))
            .map_err(|e| Error::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })
    }

    async fn request<B, T>(&self, method: Method, resource: &str, body: Option<&B>) -> Result<T, Error>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let text = self.send(method, resource, body).await?;
        serde_json::from_str(&text).map_err(|e| {
            error!(resource = resource, error = %e, "Failed to deserialize response body");
            Error::Deserialization(e)
        })
    }

    async fn send<B>(&self, method: Method, resource: &str, body: Option<&B>) -> Result<String, Error>
    where
        B: Serialize + ?Sized + Sync,
    {
        let url = self.endpoint(resource)?;
        debug!(method = %method, url = %url, "Sending request");

        let mut request = self
            .client
            .request(method, url.clone())
            .header(API_KEY_HEADER, self.api_key.expose_secret());
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            return Ok(text);
        }

        let path = url.path().to_string();
        match status {
            StatusCode::UNAUTHORIZED => Err(Error::Unauthorized),
            StatusCode::NOT_FOUND => Err(Error::NotFound(path)),
            _ => {
                let message = errors::extract_error_message(&text);
                error!(
                    status = status.as_u16(),
                    path = path.as_str(),
                    message = message.as_str(),
                    "Request rejected by server"
                );
                Err(Error::Api {
                    status: status.as_u16(),
                    path,
                    message,
                })
            }
        }
    }
}

#[async_trait]
impl ArrClient for ArrHttpClient {
    #[instrument(skip(self))]
    async fn system_status(&self) -> Result<SystemStatus, Error> {
        self.request::<(), _>(Method::GET, "system/status", None).await
    }

    #[instrument(skip(self))]
    async fn list_custom_formats(&self) -> Result<Vec<CustomFormatPayload>, Error> {
        self.request::<(), _>(Method::GET, "customformat", None).await
    }

    #[instrument(skip(self, format), fields(name = %format.name))]
    async fn create_custom_format(
        &self,
        format: &CustomFormatPayload,
    ) -> Result<CustomFormatPayload, Error> {
        self.request(Method::POST, "customformat", Some(format)).await
    }

    #[instrument(skip(self, format), fields(name = %format.name, id = ?format.id))]
    async fn update_custom_format(
        &self,
        format: &CustomFormatPayload,
    ) -> Result<CustomFormatPayload, Error> {
        let id = format
            .id
            .ok_or_else(|| Error::NotFound(format!("custom format '{}' has no id", format.name)))?;
        self.request(Method::PUT, &format!("customformat/{id}"), Some(format))
            .await
    }

    #[instrument(skip(self))]
    async fn delete_custom_format(&self, id: i64) -> Result<(), Error> {
        self.send::<()>(Method::DELETE, &format!("customformat/{id}"), None)
            .await
            .map(|_| ())
    }

    #[instrument(skip(self))]
    async fn list_quality_definitions(&self) -> Result<Vec<ServerQualityDefinition>, Error> {
        self.request::<(), _>(Method::GET, "qualitydefinition", None)
            .await
    }

    #[instrument(skip(self, definitions), fields(count = definitions.len()))]
    async fn update_quality_definitions(
        &self,
        definitions: &[ServerQualityDefinition],
    ) -> Result<Vec<ServerQualityDefinition>, Error> {
        self.request(Method::PUT, "qualitydefinition/update", Some(definitions))
            .await
    }

    #[instrument(skip(self))]
    async fn list_quality_profiles(&self) -> Result<Vec<ServerQualityProfile>, Error> {
        self.request::<(), _>(Method::GET, "qualityprofile", None).await
    }

    #[instrument(skip(self, profile), fields(name = %profile.name))]
    async fn create_quality_profile(
        &self,
        profile: &ServerQualityProfile,
    ) -> Result<ServerQualityProfile, Error> {
        self.request(Method::POST, "qualityprofile", Some(profile))
            .await
    }

    #[instrument(skip(self, profile), fields(name = %profile.name, id = ?profile.id))]
    async fn update_quality_profile(
        &self,
        profile: &ServerQualityProfile,
    ) -> Result<ServerQualityProfile, Error> {
        let id = profile
            .id
            .ok_or_else(|| Error::NotFound(format!("quality profile '{}' has no id", profile.name)))?;
        self.request(Method::PUT, &format!("qualityprofile/{id}"), Some(profile))
            .await
    }
}
