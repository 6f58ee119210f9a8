//! Configuration management for the CRM SDK
//!
//! This module provides utilities for loading configuration for the upstream
//! client, the webhook ingestor and the per-use-case timeouts, with support
//! for environment variables and in-memory values.

use std::collections::HashMap;
use std::env;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServiceError};

/// Base trait for configuration providers
pub trait ConfigProvider: Send + Sync {
    /// Get a string configuration value
    fn get_string(&self, key: &str) -> Result<String>;
}

/// Extension methods for configuration providers
pub trait ConfigProviderExt: ConfigProvider {
    /// Get an integer configuration value
    fn get_int(&self, key: &str) -> Result<i64> {
        let value = self.get_string(key)?;
        value
            .trim()
            .parse::<i64>()
            .map_err(|e| ServiceError::configuration(format!("Invalid integer for key {}: {}", key, e)))
    }

    /// Get a non-empty string value, treating an empty value as absent
    fn get_non_empty(&self, key: &str) -> Option<String> {
        self.get_string(key)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Get an integer configuration value with a default
    fn get_int_or(&self, key: &str, default: i64) -> i64 {
        self.get_int(key).unwrap_or(default)
    }
}

impl<T: ConfigProvider + ?Sized> ConfigProviderExt for T {}

/// Environment variable based configuration provider
#[derive(Debug, Clone, Default)]
pub struct EnvConfigProvider {
    /// Optional prefix for environment variables
    prefix: Option<String>,
}

impl EnvConfigProvider {
    /// Create a new environment variable config provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a prefix for environment variables
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Format a configuration key as an environment variable
    fn format_key(&self, key: &str) -> String {
        let mut env_key = String::new();

        if let Some(ref prefix) = self.prefix {
            env_key.push_str(prefix);
            env_key.push('_');
        }

        env_key.push_str(&key.to_uppercase().replace(|c: char| !c.is_ascii_alphanumeric(), "_"));

        env_key
    }
}

impl ConfigProvider for EnvConfigProvider {
    fn get_string(&self, key: &str) -> Result<String> {
        let env_key = self.format_key(key);

        env::var(&env_key).map_err(|e| match e {
            env::VarError::NotPresent => {
                ServiceError::configuration(format!("Environment variable not set: {}", env_key))
            }
            env::VarError::NotUnicode(_) => ServiceError::configuration(format!(
                "Environment variable is not valid unicode: {}",
                env_key
            )),
        })
    }
}

/// In-memory config provider for testing or static configuration
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigProvider {
    /// Configuration values
    values: HashMap<String, String>,
}

impl MemoryConfigProvider {
    /// Create a new empty memory config provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a configuration value
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: ToString,
    {
        self.values.insert(key.into(), value.to_string());
    }
}

impl ConfigProvider for MemoryConfigProvider {
    fn get_string(&self, key: &str) -> Result<String> {
        self.values
            .get(key)
            .cloned()
            .ok_or_else(|| ServiceError::configuration(format!("Configuration key not found: {}", key)))
    }
}

/// Global default configuration provider (unprefixed environment)
pub static DEFAULT_PROVIDER: Lazy<Arc<EnvConfigProvider>> =
    Lazy::new(|| Arc::new(EnvConfigProvider::new()));

/// Trait for validated configuration sections
pub trait ServiceConfig: Debug + Send + Sync {
    /// Validate this configuration
    fn validate(&self) -> Result<()>;

    /// Section name, attached to startup warnings
    fn service_name(&self) -> &str;
}

/// Connection settings for the upstream CRM API
///
/// Both values may be absent at load time. Absence only becomes an error when
/// an operation needs the upstream, so a gateway without credentials can
/// still serve health checks and webhooks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrmConfig {
    /// API root, e.g. `https://account.api-us1.com`
    pub api_url: Option<String>,

    /// API access token sent in the `Api-Token` header
    #[serde(skip_serializing)]
    pub api_token: Option<String>,
}

impl CrmConfig {
    /// Build a configuration from explicit values
    pub fn new(api_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            api_url: Some(api_url.into()),
            api_token: Some(api_token.into()),
        }
    }

    /// Load configuration from a config provider
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> Self {
        Self {
            api_url: provider.get_non_empty("ac_api_url"),
            api_token: provider.get_non_empty("ac_api_token"),
        }
    }

    /// API root with any trailing slash removed
    pub fn base_url(&self) -> Result<&str> {
        self.validate()?;
        let url = self.api_url.as_deref().unwrap_or_default();
        Ok(url.strip_suffix('/').unwrap_or(url))
    }

    /// Token, once validated
    pub fn token(&self) -> Result<&str> {
        self.validate()?;
        Ok(self.api_token.as_deref().unwrap_or_default())
    }
}

impl ServiceConfig for CrmConfig {
    fn validate(&self) -> Result<()> {
        let has_url = self.api_url.as_deref().map_or(false, |v| !v.trim().is_empty());
        let has_token = self.api_token.as_deref().map_or(false, |v| !v.trim().is_empty());

        if !has_url || !has_token {
            return Err(ServiceError::configuration("Missing AC_API_URL or AC_API_TOKEN"));
        }

        Ok(())
    }

    fn service_name(&self) -> &str {
        "crm"
    }
}

/// Settings for inbound webhook ingestion
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Shared secret expected in the `sig` query parameter
    #[serde(skip_serializing)]
    pub secret: Option<String>,
}

impl WebhookConfig {
    /// Load configuration from a config provider
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> Self {
        Self {
            secret: provider.get_non_empty("webhook_sig"),
        }
    }

    /// The configured secret
    pub fn secret(&self) -> Result<&str> {
        self.validate()?;
        Ok(self.secret.as_deref().unwrap_or_default())
    }
}

impl ServiceConfig for WebhookConfig {
    fn validate(&self) -> Result<()> {
        match self.secret.as_deref() {
            Some(secret) if !secret.is_empty() => Ok(()),
            _ => Err(ServiceError::configuration("Missing WEBHOOK_SIG in environment variables")),
        }
    }

    fn service_name(&self) -> &str {
        "webhook"
    }
}

/// Per-use-case upstream timeouts, in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Each call of the raw contact bundle
    pub contact_ms: u64,

    /// Required calls of the full-contact view
    pub full_required_ms: u64,

    /// Optional base-contact call of the full-contact view
    pub full_base_ms: u64,

    /// Each call of the normalized-contact view
    pub normalized_ms: u64,

    /// Standalone field catalog listing
    pub catalog_ms: u64,

    /// Raw passthrough fetch when no override is given
    pub fetch_default_ms: u64,

    /// Upper bound for a raw passthrough override
    pub fetch_max_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            contact_ms: 8_000,
            full_required_ms: 20_000,
            full_base_ms: 25_000,
            normalized_ms: 20_000,
            catalog_ms: 20_000,
            fetch_default_ms: 30_000,
            fetch_max_ms: 60_000,
        }
    }
}

impl TimeoutConfig {
    /// Load configuration from a config provider, falling back to defaults
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> Result<Self> {
        let defaults = Self::default();
        let read = |key: &str, default: u64| provider.get_int_or(key, default as i64).max(0) as u64;

        let config = Self {
            contact_ms: read("contact_timeout_ms", defaults.contact_ms),
            full_required_ms: read("full_required_timeout_ms", defaults.full_required_ms),
            full_base_ms: read("full_base_timeout_ms", defaults.full_base_ms),
            normalized_ms: read("normalized_timeout_ms", defaults.normalized_ms),
            catalog_ms: read("catalog_timeout_ms", defaults.catalog_ms),
            fetch_default_ms: read("fetch_default_timeout_ms", defaults.fetch_default_ms),
            fetch_max_ms: read("fetch_max_timeout_ms", defaults.fetch_max_ms),
        };

        config.validate()?;
        Ok(config)
    }

    /// Convert a millisecond setting into a `Duration`
    pub fn duration(ms: u64) -> Duration {
        Duration::from_millis(ms)
    }
}

impl ServiceConfig for TimeoutConfig {
    fn validate(&self) -> Result<()> {
        let all = [
            self.contact_ms,
            self.full_required_ms,
            self.full_base_ms,
            self.normalized_ms,
            self.catalog_ms,
            self.fetch_default_ms,
            self.fetch_max_ms,
        ];

        if all.iter().any(|ms| *ms == 0) {
            return Err(ServiceError::configuration("Timeouts must be greater than zero"));
        }

        if self.fetch_default_ms > self.fetch_max_ms {
            return Err(ServiceError::configuration(
                "Default fetch timeout exceeds the maximum fetch timeout",
            ));
        }

        Ok(())
    }

    fn service_name(&self) -> &str {
        "timeouts"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_config_provider() {
        let mut provider = MemoryConfigProvider::new();
        provider.set("key1", "value1");
        provider.set("key2", "123");

        assert_eq!(provider.get_string("key1").unwrap(), "value1");
        assert_eq!(provider.get_int("key2").unwrap(), 123);
        assert!(provider.get_string("key3").is_err());
    }

    #[test]
    fn test_env_config_provider_key_format() {
        let provider = EnvConfigProvider::new();
        assert_eq!(provider.format_key("ac_api_url"), "AC_API_URL");

        let prefixed = EnvConfigProvider::new().with_prefix("GATEWAY");
        assert_eq!(prefixed.format_key("webhook-sig"), "GATEWAY_WEBHOOK_SIG");
    }

    #[test]
    fn test_crm_config_trims_trailing_slash() {
        let config = CrmConfig::new("https://example.api-us1.com/", "tok");
        assert_eq!(config.base_url().unwrap(), "https://example.api-us1.com");
        assert_eq!(config.token().unwrap(), "tok");
    }

    #[test]
    fn test_crm_config_missing_values() {
        let mut provider = MemoryConfigProvider::new();
        provider.set("ac_api_url", "https://example.api-us1.com");
        provider.set("ac_api_token", "   ");

        let config = CrmConfig::from_provider(&provider);
        assert!(config.api_token.is_none());

        let err = config.base_url().unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_webhook_config() {
        let empty = WebhookConfig::from_provider(&MemoryConfigProvider::new());
        assert!(empty.validate().is_err());

        let mut provider = MemoryConfigProvider::new();
        provider.set("webhook_sig", "s3cret");
        let config = WebhookConfig::from_provider(&provider);
        assert_eq!(config.secret().unwrap(), "s3cret");
    }

    #[test]
    fn test_timeout_config_overrides() {
        let mut provider = MemoryConfigProvider::new();
        provider.set("full_base_timeout_ms", "40000");
        provider.set("contact_timeout_ms", "not-a-number");

        let config = TimeoutConfig::from_provider(&provider).unwrap();
        assert_eq!(config.full_base_ms, 40_000);
        assert_eq!(config.contact_ms, 8_000);
        assert_eq!(config.normalized_ms, 20_000);
    }

    #[test]
    fn test_timeout_config_rejects_inverted_fetch_bounds() {
        let mut provider = MemoryConfigProvider::new();
        provider.set("fetch_default_timeout_ms", "90000");

        assert!(TimeoutConfig::from_provider(&provider).is_err());
    }
}
