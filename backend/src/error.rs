//! Error types and error handling for the application
//!
//! This module defines custom error types that can be converted to HTTP responses.
//! All errors implement `IntoResponse` to provide consistent error formatting.

use crate::registry::{EncodeError, StoreError, UploadError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Message returned to callers for collaborator failures
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Application-level error types
///
/// Each variant implements automatic conversion to HTTP responses via `IntoResponse`.
/// Collaborator failures are logged with their cause and reported to the
/// caller with a generic message.
#[derive(Error, Debug)]
pub enum AppError {
    /// One or more required fields are absent or blank
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    /// A field is present but malformed
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A record with the given natural key already exists
    #[error("A record with key {0} already exists")]
    Conflict(String),

    /// No record with the given key
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Photo exceeds the configured size limit
    #[error("Photo exceeds the maximum size of {0} bytes")]
    PayloadTooLarge(usize),

    /// Photo MIME type is not an image type
    #[error("Unsupported media type: {0}")]
    UnsupportedMedia(String),

    /// Object store upload failed
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    /// QR encoding failed
    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),

    /// Record store operation failed
    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),

    /// Internal server error (catch-all for unexpected errors)
    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingFields(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::UnsupportedMedia(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::Upload(_)
            | AppError::Encode(_)
            | AppError::Persistence(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_message = if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
            INTERNAL_ERROR_MESSAGE.to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
