use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

use crate::validation::ValidationErrors;

/// Whether error messages are masked for production
static PRODUCTION: AtomicBool = AtomicBool::new(false);

/// Switch error masking on or off (set once at startup from config)
pub fn set_production(enabled: bool) {
    PRODUCTION.store(enabled, Ordering::Relaxed);
}

fn is_production() -> bool {
    PRODUCTION.load(Ordering::Relaxed)
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Unauthenticated.")]
    Unauthorized,

    #[error("Anda tidak memiliki akses")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("{0}")]
    Internal(String),

    #[error("{0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Validation(ValidationErrors),
}

impl AppError {
    /// Shorthand for a single-field validation failure
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation(ValidationErrors::single(field, message))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Internal(_)
            | AppError::Database(_)
            | AppError::Io(_)
            | AppError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<ValidationErrors>,
}

/// Replace raw messages with generic ones when running in production
fn public_message(status: StatusCode, message: String) -> String {
    if !is_production() {
        return message;
    }
    if status.is_server_error() {
        "Terjadi kesalahan pada server".to_string()
    } else if status == StatusCode::NOT_FOUND {
        "Data tidak ditemukan".to_string()
    } else if status == StatusCode::CONFLICT {
        "Konflik data".to_string()
    } else {
        message
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!("Request failed with {}: {}", status.as_u16(), self);
        }

        let message = public_message(status, self.to_string());
        let errors = match self {
            AppError::Validation(errors) => Some(errors),
            _ => None,
        };

        (status, Json(ErrorResponse { message, errors })).into_response()
    }
}

/// Result type alias for application
pub type AppResult<T> = Result<T, AppError>;

/// Helper trait for converting Option to AppError::NotFound
pub trait OptionExt<T> {
    fn ok_or_not_found(self, msg: impl Into<String>) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, msg: impl Into<String>) -> AppResult<T> {
        self.ok_or_else(|| AppError::NotFound(msg.into()))
    }
}

/// Helper to convert anyhow errors to AppError
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::invalid("body", rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::invalid("query", rejection.body_text())
    }
}

impl From<axum::extract::multipart::MultipartError> for AppError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        AppError::BadRequest(err.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response() {
        let err = AppError::NotFound("Jurnal guru tidak ditemukan".to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_validation_status() {
        let err = AppError::invalid("email", "Mail atau password salah.");
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.to_string(), "Mail atau password salah.");
    }

    #[test]
    fn test_option_ext() {
        let opt: Option<i32> = None;
        let result = opt.ok_or_not_found("Item not found");
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_public_message_local() {
        // Default is non-production, raw message passes through
        let msg = public_message(StatusCode::INTERNAL_SERVER_ERROR, "boom".to_string());
        assert_eq!(msg, "boom");
    }
}
