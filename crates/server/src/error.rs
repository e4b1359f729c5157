// crates/server/src/error.rs
use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use transcribe_broker::BrokerError;
use transcribe_core::{JobStatus, UploadError};
use transcribe_db::DbError;

use crate::auth::AuthError;

/// Structured JSON error response for API errors
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// API error types that map to HTTP status codes
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Upload rejected: {0}")]
    Upload(#[from] UploadError),

    #[error("Malformed multipart body: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Unauthenticated: {0}")]
    Unauthorized(#[from] AuthError),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Access denied")]
    Forbidden,

    #[error("Cannot cancel job with status {0}")]
    NotCancellable(JobStatus),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            ApiError::Upload(err) => {
                tracing::warn!(error = %err, "Upload rejected");
                (StatusCode::BAD_REQUEST, ErrorResponse::new(err.to_string()))
            }
            ApiError::Multipart(err) => {
                tracing::warn!(error = %err, "Malformed multipart body");
                (
                    err.status(),
                    ErrorResponse::with_details("invalid multipart body", err.body_text()),
                )
            }
            ApiError::Unauthorized(err) => {
                tracing::warn!(error = %err, "Unauthenticated request");
                (StatusCode::UNAUTHORIZED, ErrorResponse::new(err.to_string()))
            }
            ApiError::JobNotFound(id) => {
                tracing::debug!(job_id = %id, "Job not found");
                (StatusCode::NOT_FOUND, ErrorResponse::new("job not found"))
            }
            ApiError::Forbidden => (StatusCode::FORBIDDEN, ErrorResponse::new("access denied")),
            ApiError::NotCancellable(status) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::with_details(
                    "job cannot be cancelled",
                    format!("job is already {status}"),
                ),
            ),
            ApiError::Database(db_err) => {
                tracing::error!(error = %db_err, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("Database error"),
                )
            }
            ApiError::Broker(broker_err) => {
                tracing::error!(error = %broker_err, "Broker error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("Queue unavailable"),
                )
            }
            ApiError::Storage(io_err) => {
                tracing::error!(error = %io_err, "Upload storage error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("failed to save file"),
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!(message = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("Internal server error"),
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
