//! HTTP error mapping
//!
//! Converts SDK errors and query validation failures into structured JSON
//! bodies. Every body carries an `error` string; transport failures add a
//! `detail`, upstream HTTP failures add the upstream `status` and `body`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use crm_sdk::ServiceError;
use serde::Serialize;
use serde_json::Value;

use crate::validation::ApiValidationError;

/// JSON error body
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ErrorResponse {
    pub error: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// Name of the required upstream call that failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call: Option<String>,

    /// Upstream HTTP status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    /// Upstream response body
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            ..Self::default()
        }
    }
}

/// Error returned by route handlers
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Invalid query input
    #[error(transparent)]
    Validation(#[from] ApiValidationError),

    /// SDK failure, with the route's description of what was attempted
    #[error("{context}: {source}")]
    Service {
        context: String,
        #[source]
        source: ServiceError,
    },
}

impl ApiError {
    /// Wrap an SDK error
    pub fn service(context: impl Into<String>, source: ServiceError) -> Self {
        ApiError::Service {
            context: context.into(),
            source,
        }
    }

    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(err) => err.status_code(),
            ApiError::Service { source, .. } => match source.root() {
                ServiceError::Configuration(_) | ServiceError::Internal(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                ServiceError::Validation(_) | ServiceError::PayloadDecode(_) => StatusCode::BAD_REQUEST,
                ServiceError::Authorization(_) => StatusCode::UNAUTHORIZED,
                ServiceError::Method(_) => StatusCode::METHOD_NOT_ALLOWED,
                ServiceError::Timeout { .. }
                | ServiceError::Network(_)
                | ServiceError::UpstreamHttp { .. }
                | ServiceError::RequiredCallFailed { .. } => StatusCode::BAD_GATEWAY,
            },
        }
    }

    /// Convert to HTTP status code and error response
    pub fn to_response(&self) -> (StatusCode, Json<ErrorResponse>) {
        match self {
            ApiError::Validation(err) => err.to_response(),
            ApiError::Service { context, source } => {
                (self.status_code(), Json(service_body(context, source)))
            }
        }
    }
}

fn service_body(context: &str, source: &ServiceError) -> ErrorResponse {
    let call = source.failed_call().map(str::to_string);

    match source.root() {
        ServiceError::Configuration(message) | ServiceError::Validation(message) => {
            ErrorResponse::new(message.clone())
        }
        ServiceError::Authorization(_) => ErrorResponse::new("Unauthorized"),
        ServiceError::Method(_) => ErrorResponse::new("Method Not Allowed"),
        ServiceError::UpstreamHttp { status, body } => ErrorResponse {
            error: match &call {
                Some(call) => format!("{} failed", call),
                None => context.to_string(),
            },
            status: Some(*status),
            body: Some(body.clone()),
            call,
            ..ErrorResponse::default()
        },
        ServiceError::PayloadDecode(message) => ErrorResponse {
            detail: Some(message.clone()),
            ..ErrorResponse::new(context)
        },
        _ => ErrorResponse {
            detail: Some(source.to_string()),
            call,
            ..ErrorResponse::new(context)
        },
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.to_response().into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body_of(err: ApiError) -> (StatusCode, Value) {
        let (status, Json(body)) = err.to_response();
        (status, serde_json::to_value(body).unwrap())
    }

    #[test]
    fn test_required_call_timeout_is_bad_gateway() {
        let err = ApiError::service(
            "Failed to load full contact",
            ServiceError::required_call_failed("fieldValues", ServiceError::timeout(20_000, 20_001)),
        );

        let (status, body) = body_of(err);
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "Failed to load full contact");
        assert_eq!(body["call"], "fieldValues");
        assert!(body["detail"].as_str().unwrap().contains("within 20000ms"));
    }

    #[test]
    fn test_wrapped_configuration_error_is_internal() {
        let err = ApiError::service(
            "Failed to load contact",
            ServiceError::required_call_failed(
                "contact",
                ServiceError::configuration("Missing AC_API_URL or AC_API_TOKEN"),
            ),
        );

        let (status, body) = body_of(err);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Missing AC_API_URL or AC_API_TOKEN" }));
    }

    #[test]
    fn test_upstream_http_names_call() {
        let err = ApiError::service(
            "Failed to load normalized contact",
            ServiceError::required_call_failed(
                "contactLists",
                ServiceError::upstream_http(404, json!({ "message": "No Result found" })),
            ),
        );

        let (status, body) = body_of(err);
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "contactLists failed");
        assert_eq!(body["status"], 404);
        assert_eq!(body["body"]["message"], "No Result found");
    }

    #[test]
    fn test_webhook_errors() {
        let (status, body) = body_of(ApiError::service("Invalid payload", ServiceError::authorization("x")));
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({ "error": "Unauthorized" }));

        let (status, _) = body_of(ApiError::service("Invalid payload", ServiceError::method("x")));
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

        let (status, body) = body_of(ApiError::service("Invalid payload", ServiceError::payload_decode("bad json")));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Invalid payload", "detail": "bad json" }));
    }
}
