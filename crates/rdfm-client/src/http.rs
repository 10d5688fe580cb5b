//! HTTP client for the rdfm management server

use std::time::Duration;

use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use tracing::{debug, info, instrument, warn};
use url::Url;

use rdfm_api::{AuthToken, DeviceMetadata};

use crate::check::UpdateCheckResult;
use crate::error::{ClientError, Result};

/// Path of the device update-check endpoint, relative to the server base URL
pub const UPDATE_CHECK_PATH: &str = "/api/v1/update/check";

/// HTTP client for communicating with the management server
#[derive(Debug, Clone)]
pub struct ServerClient {
    client: Client,
    base_url: Url,
}

impl ServerClient {
    /// Create a new client with a default transport
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid.
    ///
    /// # Example
    /// ```no_run
    /// use rdfm_client::ServerClient;
    ///
    /// let client = ServerClient::new("http://localhost:5000")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new client whose requests are bounded by `timeout`
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the transport cannot be built.
    pub fn with_timeout(base_url: impl AsRef<str>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Self::with_client(base_url, client)
    }

    /// Create a new client with a caller-constructed `reqwest::Client`
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid.
    pub fn with_client(base_url: impl AsRef<str>, client: Client) -> Result<Self> {
        let base_url = Url::parse(base_url.as_ref())?;
        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            return Err(ClientError::UnsupportedUrl(base_url.to_string()));
        }
        Ok(Self { client, base_url })
    }

    /// Server base URL
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build a full URL by appending `path` to the base URL
    ///
    /// Any path prefix on the base URL is preserved.
    fn url(&self, path: &str) -> Result<Url> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}{path}"))?)
    }

    /// Ask the server whether a newer artifact exists for this device
    ///
    /// Never fails: transport and decoding problems are reported as
    /// [`UpdateCheckResult::TransportFailure`] and [`UpdateCheckResult::DecodeFailure`].
    ///
    /// # Example
    /// ```no_run
    /// # use rdfm_api::{AuthToken, DeviceMetadata};
    /// # use rdfm_client::ServerClient;
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = ServerClient::new("http://localhost:5000")?;
    /// let metadata = DeviceMetadata::new("rpi4", "1.0.0", "AA:BB");
    /// let result = client.check_update(&metadata, &AuthToken::new("token")).await;
    /// println!("{result}");
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip(self, token), level = "debug")]
    pub async fn check_update(
        &self,
        metadata: &DeviceMetadata,
        token: &AuthToken,
    ) -> UpdateCheckResult {
        let url = match self.url(UPDATE_CHECK_PATH) {
            Ok(url) => url,
            Err(e) => {
                return UpdateCheckResult::TransportFailure {
                    cause: e.to_string(),
                };
            }
        };

        info!("checking updates");

        let response = match self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, token.header_value())
            .json(metadata)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, timeout = e.is_timeout(), "update check request failed");
                return UpdateCheckResult::TransportFailure {
                    cause: e.to_string(),
                };
            }
        };

        let status = response.status().as_u16();
        debug!(status, "update check response");

        if status != 200 {
            return UpdateCheckResult::from_status(status);
        }

        match response.bytes().await {
            Ok(body) => UpdateCheckResult::from_artifact_body(&body),
            Err(e) => UpdateCheckResult::TransportFailure {
                cause: format!("failed to read package metadata: {e}"),
            },
        }
    }
}
