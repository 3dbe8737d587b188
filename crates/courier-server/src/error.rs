//! The error taxonomy shared by the domain service and the dispatcher.
//!
//! Every failure a handler can produce maps onto one of these kinds; the
//! `IntoResponse` impl is the single point translating a kind into an
//! HTTP status code and body. Infrastructure failures are logged here
//! and surfaced as a generic 500 — no internal detail leaks to callers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use courier_events::PublishError;
use courier_store::StoreError;
use serde_json::json;
use thiserror::Error;

/// Domain and infrastructure failures, ordered by HTTP severity.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No verified caller identity was attached to the request.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// The caller is authenticated but does not own the target entity.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The target entity (or its channel) does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A required field is missing or empty.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The mutation conflicts with existing state (duplicate channel name).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The backing store failed.
    #[error("storage error: {0}")]
    Storage(StoreError),

    /// The event enqueue failed after the mutation committed.
    #[error("publish error: {0}")]
    Publish(#[from] PublishError),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::NotFound(id),
            other => Self::Storage(other),
        }
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Storage(_) | Self::Publish(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = match &self {
            Self::Storage(e) => {
                tracing::error!(error = %e, "store operation failed");
                "internal server error".to_string()
            }
            Self::Publish(e) => {
                // The mutation already committed; the caller sees a 500
                // and should reconcile with a follow-up read, not retry
                // the mutation blindly.
                tracing::error!(error = %e, "event publish failed after committed mutation");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
