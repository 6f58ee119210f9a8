//! Core abstractions for the CRM SDK
//!
//! This module provides the fundamental types every upstream call produces
//! and the trait seam the aggregation engine is written against:
//!
//! - `UpstreamFetch`: performs one timed GET and returns an `UpstreamResult`
//! - `UpstreamResult`: status, decoded body and timing of one call
//! - `Decoded`: a body that is either parsed JSON or the raw text
//! - `RawResponse`: the undecoded answer, used by passthrough fetches
//! - `UpstreamClient` / `ClientBuilder`: the reqwest-backed implementation

pub mod builder;
pub mod client;

pub use builder::ClientBuilder;
pub use client::UpstreamClient;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::error::Result;

/// Trait responsible for executing one timed upstream GET
///
/// Implementations return `Err` for configuration problems and transport
/// failures (`ServiceError::Timeout` when the deadline elapsed). A response
/// with any HTTP status, including non-2xx, is an `Ok` result.
#[async_trait]
pub trait UpstreamFetch: Send + Sync {
    /// Fetch `path` (relative to the API root, already percent-encoded)
    async fn fetch(&self, path: &str, timeout: Duration) -> Result<UpstreamResult>;
}

#[async_trait]
impl<T: UpstreamFetch + ?Sized> UpstreamFetch for &T {
    async fn fetch(&self, path: &str, timeout: Duration) -> Result<UpstreamResult> {
        (**self).fetch(path, timeout).await
    }
}

#[async_trait]
impl<T: UpstreamFetch + ?Sized> UpstreamFetch for std::sync::Arc<T> {
    async fn fetch(&self, path: &str, timeout: Duration) -> Result<UpstreamResult> {
        (**self).fetch(path, timeout).await
    }
}

/// A response body: parsed JSON when possible, the raw text otherwise
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// Body parsed as JSON
    Json(Value),

    /// Body that was not valid JSON, kept verbatim
    Raw(String),
}

impl Decoded {
    /// Attempt a JSON decode, keeping the text when it fails
    pub fn from_text(text: String) -> Self {
        match serde_json::from_str::<Value>(&text) {
            Ok(value) => Decoded::Json(value),
            Err(_) => Decoded::Raw(text),
        }
    }

    /// The parsed JSON, if the body decoded
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Decoded::Json(value) => Some(value),
            Decoded::Raw(_) => None,
        }
    }

    /// Look up a top-level member of a JSON object body
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_json().and_then(|value| value.get(key))
    }

    /// Look up a top-level array member, treating absence as empty
    pub fn array(&self, key: &str) -> &[Value] {
        self.get(key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// JSON representation; raw text becomes `{"raw": text}`
    pub fn to_value(&self) -> Value {
        match self {
            Decoded::Json(value) => value.clone(),
            Decoded::Raw(text) => serde_json::json!({ "raw": text }),
        }
    }

    /// Consume into the JSON representation
    pub fn into_value(self) -> Value {
        match self {
            Decoded::Json(value) => value,
            Decoded::Raw(text) => serde_json::json!({ "raw": text }),
        }
    }
}

impl Serialize for Decoded {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Decoded::Json(value) => value.serialize(serializer),
            Decoded::Raw(text) => serde_json::json!({ "raw": text }).serialize(serializer),
        }
    }
}

/// Structured outcome of one upstream call
///
/// Either a response was received (`status > 0`, `skipped == false`) or the
/// call was degraded (`skipped == true`, `status == 0`, `error` set).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamResult {
    /// True iff `status` is in [200, 300)
    pub ok: bool,

    /// HTTP status, 0 when skipped
    pub status: u16,

    /// Decoded body, `null` when skipped
    pub body: Decoded,

    /// Wall-clock time spent on the call
    pub elapsed_ms: u64,

    /// Set when an optional call failed and was degraded
    pub skipped: bool,

    /// Failure detail of a skipped call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UpstreamResult {
    /// Result for a received response
    pub fn received(status: u16, body: Decoded, elapsed_ms: u64) -> Self {
        Self {
            ok: (200..300).contains(&status),
            status,
            body,
            elapsed_ms,
            skipped: false,
            error: None,
        }
    }

    /// Result standing in for a degraded optional call
    pub fn skipped(error: impl Into<String>, elapsed_ms: u64) -> Self {
        Self {
            ok: false,
            status: 0,
            body: Decoded::Json(Value::Null),
            elapsed_ms,
            skipped: true,
            error: Some(error.into()),
        }
    }

    /// Body as JSON, `None` for skipped results
    pub fn body_value(&self) -> Option<Value> {
        if self.skipped {
            None
        } else {
            Some(self.body.to_value())
        }
    }
}

/// Undecoded upstream answer
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// Absolute URL that was requested
    pub url: String,

    /// HTTP status
    pub status: u16,

    /// Full body text
    pub text: String,

    /// Wall-clock time spent on the call
    pub elapsed_ms: u64,
}

impl RawResponse {
    /// True iff the status is in [200, 300)
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode into an `UpstreamResult`
    pub fn into_result(self) -> UpstreamResult {
        UpstreamResult::received(self.status, Decoded::from_text(self.text), self.elapsed_ms)
    }
}
