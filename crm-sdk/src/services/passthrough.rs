//! Raw passthrough fetch
//!
//! Diagnostic GET of an arbitrary API-relative path. The answer is not
//! decoded; only the status, timing and a bounded preview of the body text
//! are reported.

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::config::TimeoutConfig;
use crate::core::{RawResponse, UpstreamClient};
use crate::error::{Result, ServiceError};
use crate::util::preview;

/// Characters of body text kept in a preview
pub const PREVIEW_CHARS: usize = 800;

const TIMEOUT_NOTE: &str =
    "The endpoint did not respond within timeoutMs; the request may still have executed upstream.";

const NETWORK_NOTE: &str = "The request failed at the network level before a response arrived.";

/// Validated passthrough request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassthroughRequest {
    /// API-relative path, starting with `/`
    pub path: String,

    /// Effective deadline
    pub timeout: Duration,
}

impl PassthroughRequest {
    /// Validate the path and resolve the timeout override
    ///
    /// The override must be a positive integer of milliseconds and is clamped
    /// to `fetch_max_ms`; without one `fetch_default_ms` applies.
    pub fn new(path: Option<&str>, timeout_ms: Option<&str>, timeouts: &TimeoutConfig) -> Result<Self> {
        let path = match path {
            Some(path) if path.starts_with('/') => path.to_string(),
            _ => {
                return Err(ServiceError::validation(
                    "Query parameter 'path' must start with '/'",
                ))
            }
        };

        let timeout_ms = match timeout_ms {
            None => timeouts.fetch_default_ms,
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(0) | Err(_) => {
                    return Err(ServiceError::validation(
                        "Query parameter 'timeoutMs' must be a positive integer",
                    ))
                }
                Ok(ms) => ms.min(timeouts.fetch_max_ms),
            },
        };

        Ok(Self {
            path,
            timeout: TimeoutConfig::duration(timeout_ms),
        })
    }
}

/// Successful passthrough answer (any HTTP status)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchPreview {
    pub ok: bool,
    pub status: u16,
    pub elapsed_ms: u64,
    pub url: String,

    /// First characters of the body text
    pub preview: String,
}

impl From<RawResponse> for FetchPreview {
    fn from(response: RawResponse) -> Self {
        Self {
            ok: response.ok(),
            status: response.status,
            elapsed_ms: response.elapsed_ms,
            preview: preview(&response.text, PREVIEW_CHARS),
            url: response.url,
        }
    }
}

/// Transport failure of a passthrough fetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchFailure {
    /// Always false
    pub ok: bool,
    pub error: String,
    pub elapsed_ms: u64,
    pub url: String,
    pub detail: String,

    /// Distinguishes a timeout from other network failures
    pub note: String,
}

impl FetchFailure {
    /// Describe a transport error
    pub fn new(url: impl Into<String>, elapsed_ms: u64, err: &ServiceError) -> Self {
        let (elapsed_ms, note) = match err.root() {
            ServiceError::Timeout { elapsed_ms, .. } => (*elapsed_ms, TIMEOUT_NOTE),
            _ => (elapsed_ms, NETWORK_NOTE),
        };

        Self {
            ok: false,
            error: "Fetch failed".to_string(),
            elapsed_ms,
            url: url.into(),
            detail: err.to_string(),
            note: note.to_string(),
        }
    }
}

/// Outcome of a passthrough fetch that reached the network
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A response arrived
    Answered(FetchPreview),

    /// Timeout or network error
    Failed(FetchFailure),
}

/// Run a passthrough fetch
///
/// Configuration errors are returned as `Err` before any network attempt;
/// transport failures become `FetchOutcome::Failed`.
pub async fn passthrough(client: &UpstreamClient, request: &PassthroughRequest) -> Result<FetchOutcome> {
    let url = client.url_for(&request.path)?;
    let started = Instant::now();

    match client.send(&request.path, request.timeout).await {
        Ok(response) => Ok(FetchOutcome::Answered(response.into())),
        Err(err) if err.is_transport() => {
            let elapsed_ms = started.elapsed().as_millis() as u64;
            Ok(FetchOutcome::Failed(FetchFailure::new(url, elapsed_ms, &err)))
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_requires_leading_slash() {
        let timeouts = TimeoutConfig::default();
        assert!(PassthroughRequest::new(Some("api/3/contacts"), None, &timeouts).is_err());
        assert!(PassthroughRequest::new(None, None, &timeouts).is_err());
        assert!(PassthroughRequest::new(Some(""), None, &timeouts).is_err());
    }

    #[test]
    fn test_request_timeout_resolution() {
        let timeouts = TimeoutConfig::default();

        let default = PassthroughRequest::new(Some("/api/3/users/me"), None, &timeouts).unwrap();
        assert_eq!(default.timeout, Duration::from_millis(30_000));

        let clamped = PassthroughRequest::new(Some("/x"), Some("999999"), &timeouts).unwrap();
        assert_eq!(clamped.timeout, Duration::from_millis(60_000));

        let explicit = PassthroughRequest::new(Some("/x"), Some("1500"), &timeouts).unwrap();
        assert_eq!(explicit.timeout, Duration::from_millis(1_500));

        assert!(PassthroughRequest::new(Some("/x"), Some("0"), &timeouts).is_err());
        assert!(PassthroughRequest::new(Some("/x"), Some("soon"), &timeouts).is_err());
    }

    #[test]
    fn test_failure_notes() {
        let timeout = FetchFailure::new("https://h/x", 1, &ServiceError::timeout(100, 101));
        assert_eq!(timeout.elapsed_ms, 101);
        assert!(timeout.note.contains("may still have executed upstream"));

        let network = FetchFailure::new("https://h/x", 7, &ServiceError::network("refused"));
        assert_eq!(network.elapsed_ms, 7);
        assert!(network.note.contains("network level"));
        assert!(!network.ok);
    }

    #[test]
    fn test_preview_is_bounded() {
        let response = RawResponse {
            url: "https://h/x".to_string(),
            status: 500,
            text: "x".repeat(2_000),
            elapsed_ms: 3,
        };

        let preview = FetchPreview::from(response);
        assert!(!preview.ok);
        assert_eq!(preview.preview.chars().count(), PREVIEW_CHARS);
    }
}
