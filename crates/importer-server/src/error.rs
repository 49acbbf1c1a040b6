//! Server-level error type for handlers outside the feature slices

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::api::response::ErrorResponse;

pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A dependency the server needs is not reachable
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::NotFound(ref message) => (StatusCode::NOT_FOUND, "NOT_FOUND", message.clone()),
            AppError::BadRequest(ref message) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message.clone())
            },
            AppError::Unavailable(ref message) => {
                tracing::error!(reason = %message, "Service unavailable");
                (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE", message.clone())
            },
            AppError::Database(ref e) => {
                tracing::error!(error = ?e, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "A database error occurred".to_string(),
                )
            },
            AppError::Internal(ref message) => {
                tracing::error!("Internal error: {}", message);
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message.clone())
            },
        };

        ErrorResponse::new(code, message).into_response_with(status)
    }
}
