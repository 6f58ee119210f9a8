//! Client builder implementation
//!
//! Provides the builder used to create and configure an `UpstreamClient`.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client as ReqwestClient;

use crate::config::CrmConfig;
use crate::core::client::UpstreamClient;
use crate::error::{Result, ServiceError};
use crate::services::common::UserAgent;

/// Header carrying the CRM API token
pub const API_TOKEN_HEADER: &str = "Api-Token";

/// Builder for `UpstreamClient`
pub struct ClientBuilder {
    /// API root
    base_url: Option<String>,

    /// API token
    api_token: Option<String>,

    /// User agent
    user_agent: UserAgent,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            base_url: None,
            api_token: None,
            user_agent: UserAgent::default(),
        }
    }
}

impl ClientBuilder {
    /// Create a new client builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed base URL and token from a loaded configuration
    pub fn config(mut self, config: &CrmConfig) -> Self {
        self.base_url = config.api_url.clone();
        self.api_token = config.api_token.clone();
        self
    }

    /// Set the API root
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the API token
    pub fn api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    /// Build the reqwest client with the configured settings
    ///
    /// No client-wide timeout is set: every call carries its own deadline,
    /// enforced by `UpstreamClient::send`.
    ///
    /// The token header is only installed when a token is present; a client
    /// without credentials still builds and reports a configuration error on
    /// its first fetch.
    pub fn build_http_client(&self) -> Result<ReqwestClient> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(token) = self.api_token.as_deref().filter(|t| !t.trim().is_empty()) {
            let mut value = HeaderValue::from_str(token)
                .map_err(|e| ServiceError::configuration(format!("Invalid API token header: {}", e)))?;
            value.set_sensitive(true);
            headers.insert(API_TOKEN_HEADER, value);
        }

        ReqwestClient::builder()
            .default_headers(headers)
            .user_agent(self.user_agent.to_string())
            .gzip(true)
            .build()
            .map_err(|e| ServiceError::configuration(format!("Failed to build HTTP client: {}", e)))
    }

    /// Build the upstream client
    pub fn build(self) -> Result<UpstreamClient> {
        let http_client = self.build_http_client()?;
        let config = CrmConfig {
            api_url: self.base_url.filter(|v| !v.trim().is_empty()),
            api_token: self.api_token.filter(|v| !v.trim().is_empty()),
        };

        Ok(UpstreamClient::from_parts(http_client, config))
    }
}
