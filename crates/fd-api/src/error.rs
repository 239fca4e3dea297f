//! API error types and handling.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use utoipa::ToSchema;

use fd_core::{ChatError, StockError};

/// API error type.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request (invalid input).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Unauthorized (missing or invalid authentication).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Forbidden (authenticated but not allowed).
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Conflict (duplicate resource, illegal state transition, or a
    /// rejected stock movement).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Validation error with field-level details.
    #[error("Validation failed")]
    ValidationError(ValidationErrorDetails),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Invalid login credentials.
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// Session expired or invalid.
    #[error("Session expired")]
    SessionExpired,

    /// Account is disabled.
    #[error("Account disabled")]
    AccountDisabled,
}

/// Details for field-level validation errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetails {
    /// Overall validation error message.
    pub message: String,
    /// Field-specific errors.
    pub fields: HashMap<String, Vec<FieldError>>,
}

/// A single field validation error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldError {
    /// Error code (e.g., "required", "length", "range").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional error parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

/// JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional error details (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::SessionExpired => StatusCode::UNAUTHORIZED,
            ApiError::AccountDisabled => StatusCode::FORBIDDEN,
        }
    }

    /// Returns the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::Internal(_) => "INTERNAL_ERROR",
            ApiError::Database(_) => "DATABASE_ERROR",
            ApiError::InvalidCredentials => "INVALID_CREDENTIALS",
            ApiError::SessionExpired => "SESSION_EXPIRED",
            ApiError::AccountDisabled => "ACCOUNT_DISABLED",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            metrics::counter!("fd_errors_total").increment(1);
        }

        let (message, details) = match &self {
            ApiError::ValidationError(details) => (
                details.message.clone(),
                Some(serde_json::to_value(&details.fields).unwrap_or_default()),
            ),
            _ => (self.to_string(), None),
        };

        let body = ErrorResponse {
            code: self.error_code().to_string(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<fd_core::db::DbError> for ApiError {
    fn from(err: fd_core::db::DbError) -> Self {
        use fd_core::db::DbError;
        match err {
            DbError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{} with id {} not found", entity, id))
            }
            DbError::Constraint(msg) => ApiError::Conflict(msg),
            DbError::Serialization(msg) => ApiError::BadRequest(msg),
            err => ApiError::Database(err.to_string()),
        }
    }
}

impl From<StockError> for ApiError {
    fn from(err: StockError) -> Self {
        match err {
            StockError::InvalidQuantity(q) => {
                ApiError::BadRequest(format!("Invalid quantity: {}", q))
            }
            StockError::InsufficientStock { .. } => ApiError::Conflict(err.to_string()),
            StockError::ItemNotFound(id) => {
                ApiError::NotFound(format!("Consumable item {} not found", id))
            }
            StockError::Db(err) => err.into(),
        }
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::TicketNotFound(id) => ApiError::NotFound(format!("Ticket {} not found", id)),
            ChatError::EmployeeNotFound(id) => {
                ApiError::NotFound(format!("Employee {} not found", id))
            }
            ChatError::NotTicketRequester { .. } => ApiError::Forbidden(err.to_string()),
            ChatError::TicketClosed(_) => ApiError::Conflict(err.to_string()),
            ChatError::EmptyMessage => ApiError::BadRequest(err.to_string()),
            ChatError::Db(err) => err.into(),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::BadRequest(format!("JSON error: {}", err))
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        let mut fields: HashMap<String, Vec<FieldError>> = HashMap::new();

        for (field_name, field_errors) in err.field_errors() {
            let errors: Vec<FieldError> = field_errors
                .iter()
                .map(|e| {
                    let code = e.code.to_string();
                    let message = e.message.clone().map(|m| m.to_string()).unwrap_or_else(|| {
                        format!("Field '{}' failed validation: {}", field_name, code)
                    });
                    let params = if e.params.is_empty() {
                        None
                    } else {
                        Some(serde_json::to_value(&e.params).unwrap_or_default())
                    };
                    FieldError {
                        code,
                        message,
                        params,
                    }
                })
                .collect();
            fields.insert(field_name.to_string(), errors);
        }

        let message = if fields.len() == 1 {
            let field = fields.keys().next().map(String::as_str).unwrap_or("?");
            format!("Validation failed for field '{}'", field)
        } else {
            format!("Validation failed for {} fields", fields.len())
        };

        ApiError::ValidationError(ValidationErrorDetails { message, fields })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Conflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::InvalidCredentials.status_code(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_stock_error_mapping() {
        let err: ApiError = StockError::InsufficientStock {
            requested: 5,
            on_hand: 2,
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);

        let err: ApiError = StockError::InvalidQuantity(-1).into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_chat_error_mapping() {
        let err: ApiError = ChatError::EmptyMessage.into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err: ApiError = ChatError::TicketClosed(uuid::Uuid::new_v4()).into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }
}
