//! Contact Gateway
//!
//! HTTP surface over the CRM SDK: contact aggregation routes, the field
//! catalog listing, a raw diagnostic fetch and the CRM webhook endpoint.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::{Json, Router};
use crm_sdk::config::{ConfigProvider, DEFAULT_PROVIDER};
use crm_sdk::{
    ContactService, CrmConfig, ServiceConfig, ServiceError, TimeoutConfig, UpstreamClient, WebhookConfig,
    WebhookIngestor,
};
use once_cell::sync::Lazy;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::Instrument;

pub mod contacts;
pub mod error;
pub mod logging;
pub mod validation;
pub mod webhook;

pub use error::{ApiError, ErrorResponse};

use validation::payload_limit_config;

/// Service name used for bind-address resolution
pub const SERVICE_NAME: &str = "CONTACT_GATEWAY";

/// Header echoing the per-request correlation id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

static START_TIME: Lazy<Instant> = Lazy::new(Instant::now);

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Core gateway state: configuration read once, clients built once
pub struct ContactGateway {
    client: UpstreamClient,
    contacts: ContactService<UpstreamClient>,
    webhook: WebhookIngestor,
}

impl ContactGateway {
    /// Build the gateway from loaded configuration
    ///
    /// Missing CRM credentials do not fail construction; the upstream routes
    /// answer with a configuration error instead.
    pub fn new(crm: &CrmConfig, webhook: WebhookConfig, timeouts: TimeoutConfig) -> crm_sdk::Result<Self> {
        let client = UpstreamClient::new(crm)?;

        Ok(Self {
            contacts: ContactService::new(client.clone(), timeouts),
            client,
            webhook: WebhookIngestor::new(webhook),
        })
    }

    /// Build the gateway from a configuration provider
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> crm_sdk::Result<Self> {
        let crm = CrmConfig::from_provider(provider);
        let webhook = WebhookConfig::from_provider(provider);
        let timeouts = TimeoutConfig::from_provider(provider)?;

        Self::new(&crm, webhook, timeouts)
    }

    /// Build the gateway from the process environment
    pub fn from_env() -> crm_sdk::Result<Self> {
        Self::from_provider(&**DEFAULT_PROVIDER)
    }

    /// CRM connection settings in use
    pub fn crm_config(&self) -> &CrmConfig {
        self.client.config()
    }

    /// Configuration sections that fail validation, by section name
    pub fn config_problems(&self) -> Vec<(&str, ServiceError)> {
        let sections: [&dyn ServiceConfig; 2] = [self.crm_config(), self.webhook.config()];

        sections
            .into_iter()
            .filter_map(|section| section.validate().err().map(|err| (section.service_name(), err)))
            .collect()
    }

    /// Create the Axum router with all routes and middleware
    pub fn create_router(self: Arc<Self>) -> Router {
        Lazy::force(&START_TIME);

        Router::new()
            .route("/", get(Self::root_handler))
            .route("/api/health", get(Self::health_handler))
            .route("/api/ac/contact", get(Self::contact_handler))
            .route("/api/ac/contact-full", get(Self::contact_full_handler))
            .route("/api/ac/normalized", get(Self::normalized_handler))
            .route("/api/ac/fields-map", get(Self::fields_map_handler))
            .route("/api/ac/fetch", get(Self::fetch_handler))
            .route("/api/webhooks/activecampaign", any(Self::webhook_handler))
            .layer(middleware::from_fn(request_id_middleware))
            .layer(TraceLayer::new_for_http())
            .layer(payload_limit_config())
            .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
            .with_state(self)
    }

    async fn root_handler() -> impl IntoResponse {
        Json(serde_json::json!({
            "service": "Contact Gateway",
            "version": env!("CARGO_PKG_VERSION"),
            "uptimeSeconds": START_TIME.elapsed().as_secs(),
            "endpoints": [
                "GET /api/health",
                "GET /api/ac/contact?id=",
                "GET /api/ac/contact-full?id=",
                "GET /api/ac/normalized?id=",
                "GET /api/ac/fields-map?limit=&offset=",
                "GET /api/ac/fetch?path=&timeoutMs=",
                "POST /api/webhooks/activecampaign?sig=&debug="
            ]
        }))
    }

    async fn health_handler() -> impl IntoResponse {
        Json(HealthResponse { status: "ok" })
    }
}

/// Tag each request with a correlation id recorded on its span
async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
    );

    let mut response = next.run(request).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}
