//! Contact routes
//!
//! Thin handlers over `ContactService`: validate the query, run the use case,
//! map the outcome to a status and JSON body.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use crm_sdk::services::common::MAX_FIELDS_PAGE;
use crm_sdk::services::passthrough::{passthrough, FetchOutcome, PassthroughRequest};
use crm_sdk::ServiceError;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::validation::{parse_u64_param, require_param, QueryParams};
use crate::ContactGateway;

impl ContactGateway {
    /// `GET /api/ac/contact?id=`
    pub(crate) async fn contact_handler(
        State(state): State<Arc<Self>>,
        Query(params): Query<QueryParams>,
    ) -> Result<Response, ApiError> {
        let id = require_param(&params, "id")?;

        let view = state
            .contacts
            .contact_bundle(id)
            .await
            .map_err(|e| ApiError::service("Failed to load contact", e))?;

        Ok(Json(view).into_response())
    }

    /// `GET /api/ac/contact-full?id=`
    pub(crate) async fn contact_full_handler(
        State(state): State<Arc<Self>>,
        Query(params): Query<QueryParams>,
    ) -> Result<Response, ApiError> {
        let id = require_param(&params, "id")?;

        let view = state
            .contacts
            .full_contact(id)
            .await
            .map_err(|e| ApiError::service("Failed to load full contact", e))?;

        if view.meta.contact_base_skipped {
            info!(contact_id = %id, "full contact served without base record");
        }

        Ok(Json(view).into_response())
    }

    /// `GET /api/ac/normalized?id=`
    pub(crate) async fn normalized_handler(
        State(state): State<Arc<Self>>,
        Query(params): Query<QueryParams>,
    ) -> Result<Response, ApiError> {
        let id = require_param(&params, "id")?;

        let view = state
            .contacts
            .normalized_contact(id)
            .await
            .map_err(|e| ApiError::service("Failed to load normalized contact", e))?;

        Ok(Json(view).into_response())
    }

    /// `GET /api/ac/fields-map?limit=&offset=`
    pub(crate) async fn fields_map_handler(
        State(state): State<Arc<Self>>,
        Query(params): Query<QueryParams>,
    ) -> Result<Response, ApiError> {
        let limit = parse_u64_param(&params, "limit", MAX_FIELDS_PAGE as u64)?;
        let offset = parse_u64_param(&params, "offset", 0)?;
        let limit = limit.min(MAX_FIELDS_PAGE as u64) as u32;

        let page = state
            .contacts
            .field_catalog(limit, offset)
            .await
            .map_err(|e| match e {
                ServiceError::UpstreamHttp { .. } => ApiError::service("Failed to fetch fields", e),
                other => ApiError::service("Failed to load fields-map", other),
            })?;

        Ok(Json(page).into_response())
    }

    /// `GET /api/ac/fetch?path=&timeoutMs=`
    ///
    /// Mirrors a non-2xx upstream status; transport failures answer 502 with
    /// a note telling a timeout apart from other network errors.
    pub(crate) async fn fetch_handler(
        State(state): State<Arc<Self>>,
        Query(params): Query<QueryParams>,
    ) -> Result<Response, ApiError> {
        let request = PassthroughRequest::new(
            params.get("path").map(String::as_str),
            params.get("timeoutMs").map(String::as_str),
            state.contacts.timeouts(),
        )
        .map_err(|e| ApiError::service("Invalid fetch request", e))?;

        let started = Instant::now();
        let outcome = passthrough(&state.client, &request)
            .await
            .map_err(|e| ApiError::service("Fetch failed", e))?;

        match outcome {
            FetchOutcome::Answered(preview) => {
                let status = if preview.ok {
                    StatusCode::OK
                } else {
                    StatusCode::from_u16(preview.status).unwrap_or(StatusCode::BAD_GATEWAY)
                };
                Ok((status, Json(preview)).into_response())
            }
            FetchOutcome::Failed(failure) => {
                warn!(
                    path = %request.path,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    detail = %failure.detail,
                    "passthrough fetch failed"
                );
                Ok((StatusCode::BAD_GATEWAY, Json(failure)).into_response())
            }
        }
    }
}
