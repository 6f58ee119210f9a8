//! Error handling for the CRM SDK
//!
//! This module provides the error taxonomy shared by the upstream client,
//! the aggregator and the webhook ingestor:
//! - Configuration problems detected before any network attempt
//! - Transport failures (timeouts are kept distinct from other network errors)
//! - Non-2xx upstream answers, carried with their status and body
//! - Inbound payload, authorization and method errors for webhooks
//! - Aggregate failures naming the required call that aborted an operation

use serde_json::Value;
use thiserror::Error;

/// Result type for CRM SDK operations
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Main error type for the CRM SDK
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Missing or invalid base configuration (API URL, token, webhook secret)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Network or connection errors
    #[error("Network error: {0}")]
    Network(String),

    /// The per-call deadline elapsed before a response arrived
    #[error("Upstream did not respond within {timeout_ms}ms (gave up after {elapsed_ms}ms)")]
    Timeout {
        /// Deadline that was configured for the call
        timeout_ms: u64,

        /// Wall-clock time spent before the call was abandoned
        elapsed_ms: u64,
    },

    /// Upstream answered with a non-2xx status
    #[error("Upstream returned HTTP {status}")]
    UpstreamHttp {
        /// HTTP status code
        status: u16,

        /// Decoded response body, kept for diagnostics
        body: Value,
    },

    /// Inbound payload could not be decoded under its declared content type
    #[error("Payload decode error: {0}")]
    PayloadDecode(String),

    /// Shared secret missing or mismatched
    #[error("Unauthorized: {0}")]
    Authorization(String),

    /// HTTP method not accepted by the endpoint
    #[error("Method not allowed: {0}")]
    Method(String),

    /// Request validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// A required aggregated call failed and aborted the whole operation
    #[error("Required upstream call '{call}' failed: {source}")]
    RequiredCallFailed {
        /// Name of the failing call
        call: String,

        /// Underlying failure
        #[source]
        source: Box<ServiceError>,
    },

    /// Unexpected or internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        ServiceError::Configuration(message.into())
    }

    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        ServiceError::Network(message.into())
    }

    /// Create a timeout error
    pub fn timeout(timeout_ms: u64, elapsed_ms: u64) -> Self {
        ServiceError::Timeout {
            timeout_ms,
            elapsed_ms,
        }
    }

    /// Create an upstream HTTP error
    pub fn upstream_http(status: u16, body: Value) -> Self {
        ServiceError::UpstreamHttp { status, body }
    }

    /// Create a payload decode error
    pub fn payload_decode(message: impl Into<String>) -> Self {
        ServiceError::PayloadDecode(message.into())
    }

    /// Create an authorization error
    pub fn authorization(message: impl Into<String>) -> Self {
        ServiceError::Authorization(message.into())
    }

    /// Create a method error
    pub fn method(message: impl Into<String>) -> Self {
        ServiceError::Method(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        ServiceError::Internal(message.into())
    }

    /// Wrap a failure of the named required call
    pub fn required_call_failed(call: impl Into<String>, source: ServiceError) -> Self {
        ServiceError::RequiredCallFailed {
            call: call.into(),
            source: Box::new(source),
        }
    }

    /// The innermost error, looking through aggregate wrappers
    pub fn root(&self) -> &ServiceError {
        match self {
            ServiceError::RequiredCallFailed { source, .. } => source.root(),
            other => other,
        }
    }

    /// Name of the required call that aborted an aggregation, if any
    pub fn failed_call(&self) -> Option<&str> {
        match self {
            ServiceError::RequiredCallFailed { call, .. } => Some(call),
            _ => None,
        }
    }

    /// Check if this is (or wraps) a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self.root(), ServiceError::Timeout { .. })
    }

    /// Check if this is (or wraps) a configuration error
    pub fn is_configuration(&self) -> bool {
        matches!(self.root(), ServiceError::Configuration(_))
    }

    /// Check if this is a transport failure (timeout or network)
    pub fn is_transport(&self) -> bool {
        matches!(
            self.root(),
            ServiceError::Timeout { .. } | ServiceError::Network(_)
        )
    }
}

/// Convert reqwest errors to ServiceError
///
/// A transport-level timeout stays a timeout. reqwest does not report the
/// deadline or the elapsed time, so both are zero until `UpstreamClient::send`
/// fills them in.
impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ServiceError::timeout(0, 0)
        } else if err.is_connect() {
            ServiceError::network(format!("Connection error: {}", err))
        } else if err.is_redirect() {
            ServiceError::network(format!("Too many redirects: {}", err))
        } else if err.is_builder() || err.is_request() {
            ServiceError::network(format!("Invalid request: {}", err))
        } else if err.is_body() || err.is_decode() {
            ServiceError::network(format!("Failed to read response body: {}", err))
        } else {
            ServiceError::network(format!("HTTP client error: {}", err))
        }
    }
}

/// Convert serde_json errors to ServiceError
impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::payload_decode(format!("JSON error: {}", err))
    }
}
