//! Contact Gateway Input Validation
//!
//! Query parameter validation for the contact routes, plus the request body
//! limit applied to every route.

use std::collections::HashMap;

use axum::http::StatusCode;
use axum::Json;
use tower_http::limit::RequestBodyLimitLayer;

use crate::error::ErrorResponse;

/// Maximum accepted request payload size (1MB)
pub const MAX_PAYLOAD_SIZE: usize = 1024 * 1024;

/// Query parameters as received
pub type QueryParams = HashMap<String, String>;

/// Validation error for API requests
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiValidationError {
    #[error("Missing {0}")]
    MissingField(String),

    #[error("Query parameter '{name}' must be a non-negative integer, got '{value}'")]
    InvalidNumber { name: String, value: String },
}

impl ApiValidationError {
    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    /// Convert to HTTP status code and error response
    pub fn to_response(&self) -> (StatusCode, Json<ErrorResponse>) {
        (self.status_code(), Json(ErrorResponse::new(self.to_string())))
    }
}

/// A required, non-empty query parameter
pub fn require_param<'a>(params: &'a QueryParams, name: &str) -> Result<&'a str, ApiValidationError> {
    params
        .get(name)
        .map(String::as_str)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiValidationError::MissingField(name.to_string()))
}

/// An optional non-negative integer query parameter
pub fn parse_u64_param(params: &QueryParams, name: &str, default: u64) -> Result<u64, ApiValidationError> {
    match params.get(name).map(|v| v.trim()).filter(|v| !v.is_empty()) {
        None => Ok(default),
        Some(value) => value.parse::<u64>().map_err(|_| ApiValidationError::InvalidNumber {
            name: name.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Request body size limit layer
pub fn payload_limit_config() -> RequestBodyLimitLayer {
    RequestBodyLimitLayer::new(MAX_PAYLOAD_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> QueryParams {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_require_param() {
        assert_eq!(require_param(&params(&[("id", "42")]), "id").unwrap(), "42");

        let err = require_param(&params(&[("id", "")]), "id").unwrap_err();
        assert_eq!(err.to_string(), "Missing id");
        assert!(require_param(&params(&[]), "id").is_err());
    }

    #[test]
    fn test_parse_u64_param() {
        assert_eq!(parse_u64_param(&params(&[]), "limit", 200).unwrap(), 200);
        assert_eq!(parse_u64_param(&params(&[("limit", "50")]), "limit", 200).unwrap(), 50);
        assert_eq!(parse_u64_param(&params(&[("limit", "")]), "limit", 200).unwrap(), 200);
        assert!(parse_u64_param(&params(&[("limit", "ten")]), "limit", 200).is_err());
        assert!(parse_u64_param(&params(&[("offset", "-1")]), "offset", 0).is_err());
    }

    #[test]
    fn test_validation_response_shape() {
        let (status, Json(body)) = ApiValidationError::MissingField("id".to_string()).to_response();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(serde_json::to_value(body).unwrap(), serde_json::json!({ "error": "Missing id" }));
    }
}
