//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::DomainError;
use crate::store::StoreError;
use crate::validation::input::FieldErrors;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Business rule violations
    #[error(transparent)]
    Domain(#[from] DomainError),

    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    Validation(FieldErrors),

    #[error("Missing required header: X-Authenticated-User")]
    MissingPrincipal,

    // Server errors (5xx)
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// The business error, if this is one
    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            AppError::Domain(e) => Some(e),
            _ => None,
        }
    }
}

impl From<FieldErrors> for AppError {
    fn from(errors: FieldErrors) -> Self {
        AppError::Validation(errors)
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldErrors>,
}

fn domain_status(err: &DomainError) -> (StatusCode, &'static str) {
    match err {
        // 404 Not Found
        DomainError::CardNotFound(_) => (StatusCode::NOT_FOUND, "card_not_found"),
        DomainError::UserNotFound(_) => (StatusCode::NOT_FOUND, "user_not_found"),
        DomainError::BlockRequestNotFound(_) => (StatusCode::NOT_FOUND, "block_request_not_found"),
        DomainError::LimitNotFound(_) => (StatusCode::NOT_FOUND, "limit_not_found"),

        // 400 Bad Request
        DomainError::CardBlocked { .. } => (StatusCode::BAD_REQUEST, "card_blocked"),
        DomainError::CardExpired { .. } => (StatusCode::BAD_REQUEST, "card_expired"),
        DomainError::CardsAreTheSame { .. } => (StatusCode::BAD_REQUEST, "cards_are_the_same"),
        DomainError::InsufficientBalance { .. } => (StatusCode::BAD_REQUEST, "insufficient_balance"),
        DomainError::LimitExceeded { .. } => (StatusCode::BAD_REQUEST, "limit_exceeded"),
        DomainError::InvalidStatusValue(_) => (StatusCode::BAD_REQUEST, "invalid_status_value"),
        DomainError::InvalidAmount(_) => (StatusCode::BAD_REQUEST, "invalid_amount"),

        // 409 Conflict
        DomainError::CardAlreadyBlocked { .. } => (StatusCode::CONFLICT, "card_already_blocked"),
        DomainError::BlockRequestCooldown { .. } => (StatusCode::CONFLICT, "block_request_cooldown"),
        DomainError::BlockRequestAlreadyResolved { .. } => {
            (StatusCode::CONFLICT, "block_request_already_resolved")
        }
        DomainError::InvalidStatusTransition { .. } => {
            (StatusCode::CONFLICT, "invalid_status_transition")
        }
        DomainError::CardAlreadyExists(_) => (StatusCode::CONFLICT, "card_already_exists"),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, details, fields) = match &self {
            AppError::Domain(domain_err) => {
                let (status, code) = domain_status(domain_err);
                (status, code, Some(domain_err.to_string()), None)
            }

            // 422 Unprocessable Entity
            AppError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_failed",
                None,
                Some(errors.clone()),
            ),

            // 401 Unauthorized
            AppError::MissingPrincipal => (StatusCode::UNAUTHORIZED, "missing_principal", None, None),

            // 500 Internal Server Error
            AppError::Store(e) => {
                tracing::error!("Storage error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "storage_error", None, None)
            }
            AppError::Config(e) => {
                tracing::error!("Config error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "config_error", None, None)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None, None)
            }
        };

        let error = match &self {
            AppError::Store(_) | AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        let body = ErrorResponse {
            error,
            error_code: error_code.to_string(),
            details,
            fields,
        };

        (status, Json(body)).into_response()
    }
}
