//! HTTP error responses.
//!
//! Every handler returns `Result<T, ApiError>`; errors render as
//! `{"error": "<message>"}` with a matching status code. Internal failures are
//! logged in full and reported with a generic message.

use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::registry::RegistryError;
use crate::relay::RelayError;
use crate::staging::StagingError;

/// Errors returned by HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("too many requests: {0}")]
    TooManyRequests(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            Self::NotFound(m) => (StatusCode::NOT_FOUND, m),
            Self::PayloadTooLarge(m) => (StatusCode::PAYLOAD_TOO_LARGE, m),
            Self::TooManyRequests(m) => (StatusCode::TOO_MANY_REQUESTS, m),
            Self::Internal(m) => {
                error!(message = %m, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge(err.body_text())
        } else {
            Self::BadRequest(err.body_text())
        }
    }
}

impl From<StagingError> for ApiError {
    fn from(err: StagingError) -> Self {
        match err {
            StagingError::NotAnImage(_) => Self::BadRequest(err.to_string()),
            StagingError::TooLarge { .. } => Self::PayloadTooLarge(err.to_string()),
            StagingError::Io(e) => Self::Internal(format!("failed to stage image: {e}")),
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::TaskNotFound { .. } => Self::NotFound(err.to_string()),
            RegistryError::TooManySubscribers { .. } => Self::TooManyRequests(err.to_string()),
        }
    }
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::Rejected(veogen_core::Error::Validation(message)) => {
                Self::BadRequest(message)
            }
            RelayError::Registry(e) => e.into(),
            other => Self::Internal(other.to_string()),
        }
    }
}
