use crate::{Metadata, MetadataFetcher, PreviewError};
use async_trait::async_trait;
use reqwest::{header::HeaderMap, Client};
use std::time::Duration;
use tracing::{debug, error};

const DEFAULT_USER_AGENT: &str = "link-preview/0.2";

/// Production [`MetadataFetcher`]: GETs the orchestrator's request target
/// and deserializes the JSON body into a [`Metadata`] record.
///
/// This is the default wiring for talking to a real metadata endpoint;
/// anything fancier (auth, retries, a different transport) belongs in a
/// custom `MetadataFetcher` implementation.
#[derive(Clone)]
pub struct HttpMetadataFetcher {
    client: Client,
}

/// Client options for [`HttpMetadataFetcher::new_with_config`].
pub struct FetcherConfig {
    pub user_agent: String,
    pub timeout: Duration,
    pub headers: Option<HeaderMap>,
    pub redirect_policy: Option<reqwest::redirect::Policy>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(10),
            headers: None,
            redirect_policy: None,
        }
    }
}

impl Default for HttpMetadataFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpMetadataFetcher {
    pub fn new() -> Self {
        Self::new_with_config(FetcherConfig::default())
    }

    pub fn new_with_config(config: FetcherConfig) -> Self {
        let mut builder = Client::builder()
            .user_agent(config.user_agent)
            .timeout(config.timeout)
            .pool_max_idle_per_host(10);

        if let Some(headers) = config.headers {
            builder = builder.default_headers(headers);
        }
        if let Some(redirect_policy) = config.redirect_policy {
            builder = builder.redirect(redirect_policy);
        }

        let client = builder.build().unwrap_or_else(|e| {
            error!(error = %e, "Failed to create HTTP client");
            panic!("Failed to initialize HTTP client: {e}");
        });
        Self { client }
    }

    /// Wraps an already-configured client, e.g. one shared with the rest of
    /// the application.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MetadataFetcher for HttpMetadataFetcher {
    async fn fetch_metadata(&self, request_url: &str) -> Result<Metadata, PreviewError> {
        debug!(url = %request_url, "Requesting link metadata");

        let response = self.client.get(request_url).send().await.map_err(|e| {
            error!(error = %e, url = %request_url, "Metadata request failed");
            PreviewError::Fetch(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PreviewError::Fetch(format!(
                "metadata endpoint returned {status}"
            )));
        }

        let metadata = response.json::<Metadata>().await.map_err(|e| {
            error!(error = %e, url = %request_url, "Metadata payload was not decodable");
            PreviewError::Fetch(e.to_string())
        })?;

        debug!(url = %request_url, title = ?metadata.title, "Metadata received");
        Ok(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_documented_values() {
        let config = FetcherConfig::default();
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert!(config.headers.is_none());
    }
}
