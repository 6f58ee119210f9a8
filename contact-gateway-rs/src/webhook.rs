//! CRM webhook endpoint
//!
//! Accepts any method so that non-POST calls get a 405 only after the shared
//! secret has been checked.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::header::{CONTENT_TYPE, USER_AGENT};
use axum::http::{HeaderMap, Method, Uri};
use axum::Json;
use crm_sdk::{WebhookIngestor, WebhookSummary};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::validation::QueryParams;
use crate::ContactGateway;

/// Acknowledgement body
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,

    /// Present when `debug=1` or `debug=true`
    #[serde(flatten)]
    pub debug: Option<WebhookSummary>,
}

fn debug_requested(params: &QueryParams) -> bool {
    matches!(params.get("debug").map(String::as_str), Some("1") | Some("true"))
}

fn header_text<'a>(headers: &'a HeaderMap, name: axum::http::HeaderName) -> &'a str {
    headers.get(name).and_then(|v| v.to_str().ok()).unwrap_or_default()
}

impl ContactGateway {
    /// `ANY /api/webhooks/activecampaign?sig=&debug=`
    pub(crate) async fn webhook_handler(
        State(state): State<Arc<Self>>,
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        Query(params): Query<QueryParams>,
        body: Bytes,
    ) -> Result<Json<WebhookAck>, ApiError> {
        let content_type = header_text(&headers, CONTENT_TYPE);

        let event = state
            .webhook
            .ingest(params.get("sig").map(String::as_str), method.as_str(), content_type, &body)
            .map_err(|e| {
                warn!(path = %uri.path(), method = %method, error = %e, "webhook rejected");
                ApiError::service("Invalid payload", e)
            })?;

        // the query string holds the secret and is never logged
        info!(
            received_at = %event.received_at.to_rfc3339(),
            path = %uri.path(),
            content_type = %content_type,
            user_agent = %header_text(&headers, USER_AGENT),
            contact_id = ?event.contact_id,
            email = ?event.email,
            top_level = %serde_json::Value::Object(event.top_level.clone()),
            payload = %event.raw_payload,
            "AC_WEBHOOK_RECEIVED"
        );

        let debug = debug_requested(&params).then(|| WebhookIngestor::summarize(&event.raw_payload));

        Ok(Json(WebhookAck { received: true, debug }))
    }
}
