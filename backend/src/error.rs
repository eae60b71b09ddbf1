//! Error handling for the Farm Management Platform
//!
//! Every failure leaves the API as a JSON body with a stable code so the
//! mobile and web clients can render it inline.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::{insufficient_stock_message, StockError};
use thiserror::Error;
use uuid::Uuid;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Conflict: {message}")]
    Conflict { resource: String, message: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Business logic errors
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("{}", insufficient_stock_message(.item_name, .unit, .current_qty))]
    InsufficientStock {
        item_id: Uuid,
        item_name: String,
        unit: String,
        current_qty: Decimal,
        requested: Decimal,
    },

    // Persistence errors
    #[error("Persistence failure: {0}")]
    PersistenceFailure(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Whether resubmitting the same request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::PersistenceFailure(_))
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            AppError::TokenExpired => "TOKEN_EXPIRED",
            AppError::InvalidToken => "INVALID_TOKEN",
            AppError::InsufficientPermissions => "INSUFFICIENT_PERMISSIONS",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Validation { .. } => "VALIDATION_ERROR",
            AppError::Conflict { .. } => "CONFLICT",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InvalidStateTransition(_) => "INVALID_STATE_TRANSITION",
            AppError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            AppError::PersistenceFailure(_) => "PERSISTENCE_FAILURE",
            AppError::Internal(_) | AppError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::TokenExpired | AppError::InvalidToken | AppError::Unauthorized(_) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::InsufficientPermissions => StatusCode::FORBIDDEN,
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidStateTransition(_) | AppError::InsufficientStock { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::PersistenceFailure(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) | AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> ErrorDetail {
        let (message, field, details) = match self {
            AppError::TokenExpired => ("Token has expired".to_string(), None, None),
            AppError::InvalidToken => ("Invalid token".to_string(), None, None),
            AppError::InsufficientPermissions => (
                "You do not have permission to perform this action".to_string(),
                None,
                None,
            ),
            AppError::Unauthorized(message) => (message.clone(), None, None),
            AppError::Validation { field, message } => (message.clone(), Some(field.clone()), None),
            AppError::Conflict { resource, message } => {
                (message.clone(), Some(resource.clone()), None)
            }
            AppError::NotFound(resource) => (format!("{} not found", resource), None, None),
            AppError::InvalidStateTransition(message) => (message.clone(), None, None),
            AppError::InsufficientStock {
                item_id,
                item_name,
                unit,
                current_qty,
                requested,
            } => (
                self.to_string(),
                Some("quantity".to_string()),
                Some(serde_json::json!({
                    "item_id": item_id,
                    "item_name": item_name,
                    "unit": unit,
                    "current_qty": current_qty,
                    "requested": requested,
                })),
            ),
            AppError::PersistenceFailure(_) => (
                "The service is temporarily unavailable. Please try again.".to_string(),
                None,
                None,
            ),
            AppError::Internal(_) | AppError::InternalError(_) => {
                ("An internal server error occurred".to_string(), None, None)
            }
        };

        ErrorDetail {
            code: self.code().to_string(),
            message,
            field,
            retryable: self.is_retryable(),
            details,
        }
    }
}

impl From<StockError> for AppError {
    fn from(err: StockError) -> Self {
        match err {
            StockError::ItemNotFound(_) => AppError::NotFound("Inventory item".to_string()),
            StockError::InvalidQuantity | StockError::QuantityTooPrecise => {
                AppError::validation("quantity", err.to_string())
            }
            StockError::InsufficientStock {
                item_id,
                item_name,
                unit,
                current_qty,
                requested,
            } => AppError::InsufficientStock {
                item_id,
                item_name,
                unit,
                current_qty,
                requested,
            },
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let (field, message) = errors
            .field_errors()
            .into_iter()
            .next()
            .map(|(field, errs)| {
                let message = errs
                    .first()
                    .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                    .unwrap_or_else(|| format!("Invalid value for {}", field));
                (field.to_string(), message)
            })
            .unwrap_or_else(|| ("input".to_string(), "Invalid input".to_string()));

        AppError::Validation { field, message }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(error = ?self, "Request failed");
        } else {
            tracing::debug!(error = %self, code = self.code(), "Request rejected");
        }

        (status, Json(ErrorResponse { error: self.detail() })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;

/// Turn a unique-constraint violation into a conflict on `resource`
pub fn unique_violation(err: sqlx::Error, resource: &str, message: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => AppError::Conflict {
            resource: resource.to_string(),
            message: message.to_string(),
        },
        _ => AppError::PersistenceFailure(err),
    }
}
