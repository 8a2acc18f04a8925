//! Unified error handling for the alarme services
//!
//! One error taxonomy shared by the controller layer, the record store and
//! the command workers, so the propagation policy (what reaches the HTTP
//! caller, what is operator-visible only) can be decided in one place.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

// ============================================================================
// ErrorInfo - API error response type
// ============================================================================

/// Standard error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Error code (HTTP status or custom)
    pub code: u16,
    /// Error message
    pub message: String,
    /// Detailed error description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Field-specific errors for validation
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub field_errors: HashMap<String, Vec<String>>,
}

impl ErrorInfo {
    /// Create a new ErrorInfo with just a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: 500,
            message: message.into(),
            details: None,
            field_errors: HashMap::new(),
        }
    }

    /// Set the error code
    pub fn with_code(mut self, code: u16) -> Self {
        self.code = code;
        self
    }

    /// Add details
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Add a field error
    pub fn add_field_error(mut self, field: impl Into<String>, error: impl Into<String>) -> Self {
        self.field_errors
            .entry(field.into())
            .or_default()
            .push(error.into());
        self
    }
}

// ============================================================================
// AlarmeError - Main error type
// ============================================================================

/// Main error type for the alarme services
#[derive(Debug, Error)]
pub enum AlarmeError {
    // ======================================
    // Caller-visible errors (synchronous 4xx)
    // ======================================
    #[error("Validation failed")]
    Validation {
        field_errors: HashMap<String, Vec<String>>,
    },

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized")]
    Unauthorized,

    // ======================================
    // Infrastructure errors
    // ======================================
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Queue error: {0}")]
    Queue(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AlarmeError {
    /// Validation error for a single field
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        let mut field_errors = HashMap::new();
        field_errors.insert(field.into(), vec![reason.into()]);
        Self::Validation { field_errors }
    }

    /// HTTP status code this error maps to
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation { .. } => 400,
            Self::Unauthorized => 401,
            Self::Precondition(_) => 403,
            Self::NotFound { .. } => 404,
            Self::Conflict(_) => 409,
            Self::Database(_)
            | Self::Redis(_)
            | Self::Serialization(_)
            | Self::Queue(_)
            | Self::Configuration(_)
            | Self::Internal(_) => 500,
        }
    }

    /// Whether a command worker should redeliver the message after this
    /// failure. Only infrastructure hiccups are retryable; domain failures
    /// (not found, precondition, validation) will not resolve themselves.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Database(_) | Self::Redis(_) | Self::Queue(_) | Self::Internal(_)
        )
    }

    /// Convert to the API error payload
    pub fn to_error_info(&self) -> ErrorInfo {
        let mut info = ErrorInfo::new(self.to_string()).with_code(self.http_status());
        if let Self::Validation { field_errors } = self {
            info.field_errors = field_errors.clone();
        }
        info
    }
}

impl From<anyhow::Error> for AlarmeError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Result type alias using AlarmeError
pub type Result<T> = std::result::Result<T, AlarmeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(
            AlarmeError::invalid_field("status", "out of range").http_status(),
            400
        );
        assert_eq!(
            AlarmeError::Precondition("closed".into()).http_status(),
            403
        );
        assert_eq!(
            AlarmeError::NotFound {
                entity: "alarme",
                id: 7
            }
            .http_status(),
            404
        );
        assert_eq!(AlarmeError::Conflict("dup".into()).http_status(), 409);
    }

    #[test]
    fn test_retryability() {
        assert!(!AlarmeError::NotFound {
            entity: "alarme",
            id: 1
        }
        .is_retryable());
        assert!(!AlarmeError::Precondition("x".into()).is_retryable());
        assert!(AlarmeError::Queue("lost connection".into()).is_retryable());
    }

    #[test]
    fn test_validation_error_info_carries_fields() {
        let err = AlarmeError::invalid_field("criticidade", "must be 0..=4");
        let info = err.to_error_info();
        assert_eq!(info.code, 400);
        assert_eq!(info.field_errors["criticidade"], vec!["must be 0..=4"]);
    }
}
