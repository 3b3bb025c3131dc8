//! Shared types and error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::protocol::MiddlewareError;

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// API error types
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<MiddlewareError> for ApiError {
    fn from(e: MiddlewareError) -> Self {
        match &e {
            MiddlewareError::InvalidAddress(_)
            | MiddlewareError::TaxRateInvalid { .. }
            | MiddlewareError::AmountOverflow
            | MiddlewareError::MissingAddress => ApiError::BadRequest(e.to_string()),
            MiddlewareError::RecordNotFound { .. } => ApiError::NotFound(e.to_string()),
            _ => ApiError::Internal(e.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_middleware_error_mapping() {
        assert!(matches!(
            ApiError::from(MiddlewareError::RecordNotFound { asset_id: 1 }),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from(MiddlewareError::TaxRateInvalid {
                total_tax_bps: 10_000
            }),
            ApiError::BadRequest(_)
        ));
        assert!(matches!(
            ApiError::from(MiddlewareError::ContractCall("boom".into())),
            ApiError::Internal(_)
        ));
    }

    #[test]
    fn test_status_codes() {
        let response = ApiError::NotFound("asset 1".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
