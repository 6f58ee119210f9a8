//! Upstream CRM client
//!
//! Performs one timed GET against the CRM REST API and normalizes the answer.
//! The per-call deadline is raced against the whole exchange (send and body
//! read); when the deadline wins, the in-flight request future is dropped,
//! which aborts it, and the caller receives `ServiceError::Timeout`.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use crate::config::CrmConfig;
use crate::core::builder::ClientBuilder;
use crate::core::{RawResponse, UpstreamFetch, UpstreamResult};
use crate::error::{Result, ServiceError};

/// reqwest-backed implementation of `UpstreamFetch`
#[derive(Clone)]
pub struct UpstreamClient {
    /// Pooled HTTP client carrying the default headers
    http_client: Client,

    /// Base URL and token
    config: CrmConfig,
}

impl std::fmt::Debug for UpstreamClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamClient")
            .field("api_url", &self.config.api_url)
            .field("has_token", &self.config.api_token.is_some())
            .finish()
    }
}

impl UpstreamClient {
    /// Create a client from a loaded configuration
    pub fn new(config: &CrmConfig) -> Result<Self> {
        ClientBuilder::new().config(config).build()
    }

    /// Create a new builder
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub(crate) fn from_parts(http_client: Client, config: CrmConfig) -> Self {
        Self { http_client, config }
    }

    /// The configuration this client was built with
    pub fn config(&self) -> &CrmConfig {
        &self.config
    }

    /// Absolute URL for a request-relative path
    ///
    /// Fails with a configuration error when the base URL or token is absent.
    pub fn url_for(&self, path: &str) -> Result<String> {
        Ok(format!("{}{}", self.config.base_url()?, path))
    }

    /// Perform the GET and return the undecoded answer
    pub async fn send(&self, path: &str, timeout: Duration) -> Result<RawResponse> {
        let url = self.url_for(path)?;
        let started = Instant::now();

        let exchange = async {
            let response = self.http_client.get(&url).send().await?;
            let status = response.status().as_u16();
            let text = response.text().await?;
            Ok::<_, ServiceError>((status, text))
        };

        match tokio::time::timeout(timeout, exchange).await {
            Ok(Ok((status, text))) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                debug!(path = %path, status, elapsed_ms, "upstream call completed");
                Ok(RawResponse {
                    url,
                    status,
                    text,
                    elapsed_ms,
                })
            }
            Ok(Err(err)) if err.is_timeout() => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                let timeout_ms = timeout.as_millis() as u64;
                warn!(path = %path, timeout_ms, elapsed_ms, "upstream call timed out in transport");
                Err(ServiceError::timeout(timeout_ms, elapsed_ms))
            }
            Ok(Err(err)) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                warn!(path = %path, elapsed_ms, error = %err, "upstream call failed");
                Err(err)
            }
            Err(_) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                let timeout_ms = timeout.as_millis() as u64;
                warn!(path = %path, timeout_ms, elapsed_ms, "upstream call timed out");
                Err(ServiceError::timeout(timeout_ms, elapsed_ms))
            }
        }
    }
}

#[async_trait]
impl UpstreamFetch for UpstreamClient {
    async fn fetch(&self, path: &str, timeout: Duration) -> Result<UpstreamResult> {
        Ok(self.send(path, timeout).await?.into_result())
    }
}
