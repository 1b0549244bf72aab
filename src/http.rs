//! HTTP client shared by every pipeline phase
//!
//! A thin wrapper over `reqwest::Client` that applies the configured timeouts
//! and turns transport failures and non-success statuses into [`Error::Fetch`].
//! Pages use `request_timeout`; artifact downloads use the longer
//! `artifact_timeout`.

use std::time::Duration;

use crate::config::HttpConfig;
use crate::error::{Error, Result};

/// GET-only client with per-request timeout
#[derive(Clone, Debug)]
pub struct HttpClient {
    inner: reqwest::Client,
    artifact_timeout: Duration,
}

impl HttpClient {
    /// Build a client from configuration
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| Error::Config {
                message: format!("failed to create HTTP client: {e}"),
                key: Some("http".to_string()),
            })?;
        Ok(Self {
            inner,
            artifact_timeout: config.artifact_timeout,
        })
    }

    /// Fetch a page and return its body as text
    pub async fn get_text(&self, url: &str) -> Result<String> {
        let response = self.get(url).await?;
        response.text().await.map_err(|e| Error::fetch(url, &e))
    }

    /// Issue a GET and return the response with its body not yet read
    ///
    /// The status has already been checked; the caller streams the body.
    pub async fn get(&self, url: &str) -> Result<reqwest::Response> {
        self.send(self.inner.get(url), url).await
    }

    /// Like [`get`](Self::get), bounded by the artifact timeout instead of the page timeout
    pub async fn get_artifact(&self, url: &str) -> Result<reqwest::Response> {
        let request = self.inner.get(url).timeout(self.artifact_timeout);
        self.send(request, url).await
    }

    async fn send(&self, request: reqwest::RequestBuilder, url: &str) -> Result<reqwest::Response> {
        tracing::debug!(url = %url, "GET");
        let response = request.send().await.map_err(|e| Error::fetch(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url = %url, status = status.as_u16(), "non-success response");
            return Err(Error::Fetch {
                url: url.to_string(),
                reason: format!("HTTP {status}"),
            });
        }
        Ok(response)
    }
}
