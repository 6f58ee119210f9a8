//! Webhook ingestion
//!
//! Validates and decodes inbound CRM webhook callbacks. The checks run in a
//! fixed order: secret configured, shared secret matches, method is POST, body
//! decodes. A mismatched secret is rejected before the body is looked at.
//!
//! The shared secret travels as a plain `sig` query parameter and is compared
//! for equality. It is not a signature over the body; hardening it would
//! change the contract with the sender.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::WebhookConfig;
use crate::error::{Result, ServiceError};
use crate::util::{preview, stringify_id};

/// Top-level payload keys surfaced in every event
pub const TOP_LEVEL_KEYS: [&str; 5] = ["type", "event", "action", "date_time", "initiated_from"];

/// Keys listed in a debug summary
pub const SUMMARY_KEY_LIMIT: usize = 25;

/// Key/value pairs sampled in a debug summary
pub const SUMMARY_SAMPLE_LIMIT: usize = 10;

/// Longest string value kept in a debug sample
pub const SUMMARY_VALUE_CHARS: usize = 200;

const MASK: &str = "***";

/// How an inbound body is decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// `application/json`
    Json,

    /// `application/x-www-form-urlencoded`
    Form,

    /// Anything else: best-effort JSON, raw text otherwise
    Other,
}

impl BodyKind {
    /// Classify a `Content-Type` header value
    pub fn from_content_type(content_type: &str) -> Self {
        let content_type = content_type.to_ascii_lowercase();

        if content_type.contains("application/json") {
            BodyKind::Json
        } else if content_type.contains("application/x-www-form-urlencoded") {
            BodyKind::Form
        } else {
            BodyKind::Other
        }
    }
}

/// Canonical view of one webhook callback
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    /// `contact[id]`, else `contact_id`, else `id`
    pub contact_id: Option<String>,

    /// `contact[email]`, else `email`
    pub email: Option<String>,

    /// Subset of `TOP_LEVEL_KEYS` present in the payload
    pub top_level: Map<String, Value>,

    /// Decoded payload
    pub raw_payload: Value,

    /// Receipt time
    pub received_at: DateTime<Utc>,
}

/// Bounded description of a payload for debug responses
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookSummary {
    /// Number of top-level keys
    pub key_count: usize,

    /// First keys of the payload
    pub keys: Vec<String>,

    /// First key/value pairs, secrets masked, long strings truncated
    pub sample: Map<String, Value>,
}

/// Validates and decodes webhook callbacks
#[derive(Debug, Clone)]
pub struct WebhookIngestor {
    config: WebhookConfig,
}

impl WebhookIngestor {
    /// Create an ingestor
    pub fn new(config: WebhookConfig) -> Self {
        Self { config }
    }

    /// Settings this ingestor checks requests against
    pub fn config(&self) -> &WebhookConfig {
        &self.config
    }

    /// Check the shared secret
    ///
    /// A missing server-side secret is a configuration error; a missing or
    /// different `sig` is an authorization error.
    pub fn authorize(&self, sig: Option<&str>) -> Result<()> {
        let expected = self.config.secret()?;

        match sig {
            Some(sig) if !sig.is_empty() && sig == expected => Ok(()),
            _ => Err(ServiceError::authorization("Unauthorized")),
        }
    }

    /// Only POST is accepted
    pub fn check_method(method: &str) -> Result<()> {
        if method.eq_ignore_ascii_case("POST") {
            Ok(())
        } else {
            Err(ServiceError::method("Method Not Allowed"))
        }
    }

    /// Decode a body according to its content type
    pub fn decode(content_type: &str, body: &[u8]) -> Result<Value> {
        match BodyKind::from_content_type(content_type) {
            BodyKind::Json => {
                if body.iter().all(u8::is_ascii_whitespace) {
                    return Err(ServiceError::payload_decode("Empty JSON body"));
                }
                Ok(serde_json::from_slice(body)?)
            }
            BodyKind::Form => {
                let text = std::str::from_utf8(body)
                    .map_err(|e| ServiceError::payload_decode(format!("Form body is not UTF-8: {}", e)))?;

                let map: Map<String, Value> = url::form_urlencoded::parse(text.as_bytes())
                    .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
                    .collect();

                Ok(Value::Object(map))
            }
            BodyKind::Other => {
                let text = String::from_utf8_lossy(body).into_owned();
                Ok(serde_json::from_str(&text).unwrap_or_else(|_| serde_json::json!({ "raw": text })))
            }
        }
    }

    /// Extract identifiers and highlights from a decoded payload
    pub fn extract(payload: Value) -> WebhookEvent {
        let first = |keys: &[&str]| keys.iter().find_map(|k| payload.get(*k).and_then(stringify_id));

        let contact_id = first(&["contact[id]", "contact_id", "id"]);
        let email = first(&["contact[email]", "email"]);

        let top_level = TOP_LEVEL_KEYS
            .iter()
            .filter_map(|k| payload.get(*k).map(|v| (k.to_string(), v.clone())))
            .collect();

        WebhookEvent {
            contact_id,
            email,
            top_level,
            raw_payload: payload,
            received_at: Utc::now(),
        }
    }

    /// Run the full check-and-decode sequence
    pub fn ingest(
        &self,
        sig: Option<&str>,
        method: &str,
        content_type: &str,
        body: &[u8],
    ) -> Result<WebhookEvent> {
        self.authorize(sig)?;
        Self::check_method(method)?;
        let payload = Self::decode(content_type, body)?;
        Ok(Self::extract(payload))
    }

    /// Bounded debug description of a payload
    pub fn summarize(payload: &Value) -> WebhookSummary {
        let Some(object) = payload.as_object() else {
            return WebhookSummary {
                key_count: 0,
                keys: Vec::new(),
                sample: Map::new(),
            };
        };

        let keys = object.keys().take(SUMMARY_KEY_LIMIT).cloned().collect();

        let sample = object
            .iter()
            .take(SUMMARY_SAMPLE_LIMIT)
            .map(|(k, v)| {
                let value = if is_sensitive_key(k) {
                    Value::String(MASK.to_string())
                } else {
                    match v {
                        Value::String(s) => Value::String(preview(s, SUMMARY_VALUE_CHARS)),
                        other => other.clone(),
                    }
                };
                (k.clone(), value)
            })
            .collect();

        WebhookSummary {
            key_count: object.len(),
            keys,
            sample,
        }
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key == "sig" || ["token", "secret", "password"].iter().any(|s| key.contains(s))
}
