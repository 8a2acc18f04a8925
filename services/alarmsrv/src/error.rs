//! HTTP error responses
//!
//! Wraps the shared [`AlarmeError`] taxonomy into an axum response. Only
//! validation, precondition, not-found and conflict errors are intended to
//! reach callers; infrastructure errors surface as opaque 500s and are
//! logged at the point of failure.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use errors::{AlarmeError, ErrorInfo};
use serde::Serialize;

/// Standard error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorInfo,
}

/// Application error with HTTP status code
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: ErrorInfo,
}

impl ApiError {
    pub fn new(status: StatusCode, error: ErrorInfo) -> Self {
        Self { status, error }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: ErrorInfo::new(message).with_code(400),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            error: ErrorInfo::new(message).with_code(401),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            error: ErrorInfo::new(message).with_code(403),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            error: ErrorInfo::new(message).with_code(404),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            error: ErrorInfo::new(message).with_code(409),
        }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: ErrorInfo::new(message).with_code(500),
        }
    }
}

impl From<AlarmeError> for ApiError {
    fn from(err: AlarmeError) -> Self {
        let status =
            StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        // Do not leak infrastructure details to callers
        let error = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Internal error: {}", err);
            ErrorInfo::new("Internal server error").with_code(500)
        } else {
            err.to_error_info()
        };
        Self { status, error }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                success: false,
                error: self.error,
            }),
        )
            .into_response()
    }
}
