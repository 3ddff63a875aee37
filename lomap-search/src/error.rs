//! Error types for lomap-search HTTP handlers

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::ListingError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Upstream AI service failed (502)
    #[error("Upstream service error: {0}")]
    BadGateway(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Feature needs configuration that is missing (503)
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// lomap-common error
    #[error("Common error: {0}")]
    Common(#[from] lomap_common::Error),
}

impl From<ListingError> for ApiError {
    fn from(err: ListingError) -> Self {
        match err {
            ListingError::InvalidImage(msg) => ApiError::BadRequest(msg),
            ListingError::Upstream(e) => ApiError::BadGateway(e.to_string()),
            e @ ListingError::NoConceptImage => ApiError::BadGateway(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", msg),
            ApiError::Internal(msg) => {
                tracing::error!("Request failed: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg)
            }
            ApiError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", msg)
            }
            ApiError::Common(lomap_common::Error::NotFound(msg)) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", msg)
            }
            ApiError::Common(lomap_common::Error::InvalidInput(msg)) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg)
            }
            ApiError::Common(ref err) => {
                tracing::error!("Request failed: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "COMMON_ERROR", err.to_string())
            }
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_errors_map_to_client_statuses() {
        let not_found = ApiError::from(lomap_common::Error::NotFound("p1".to_string())).into_response();
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let invalid = ApiError::from(lomap_common::Error::InvalidInput("bad".to_string())).into_response();
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

        let config = ApiError::from(lomap_common::Error::Config("x".to_string())).into_response();
        assert_eq!(config.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_listing_errors() {
        let invalid = ApiError::from(ListingError::InvalidImage("empty".to_string())).into_response();
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

        let upstream = ApiError::from(ListingError::Upstream(
            crate::services::GeminiError::RateLimitExceeded,
        ))
        .into_response();
        assert_eq!(upstream.status(), StatusCode::BAD_GATEWAY);

        let no_image = ApiError::from(ListingError::NoConceptImage).into_response();
        assert_eq!(no_image.status(), StatusCode::BAD_GATEWAY);
    }
}
