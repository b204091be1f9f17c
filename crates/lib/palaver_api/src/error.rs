//! Application error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use palaver_core::completion::RelayError;
use palaver_core::store::StoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Body of every error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// Upstream provider answered with a non-success status.
    #[error("OpenRouter request failed: {status}")]
    Upstream { status: u16 },

    #[error("{0}")]
    Misconfigured(String),

    #[error("Request cancelled")]
    Cancelled,

    /// The message is returned to the caller; details belong in the log.
    #[error("{0}")]
    Internal(String),
}

/// Non-standard status for a request the client abandoned.
pub fn client_closed_request() -> StatusCode {
    StatusCode::from_u16(499).unwrap_or(StatusCode::BAD_REQUEST)
}

impl AppError {
    /// Map a store failure, logging it with the operation that hit it.
    pub fn store(operation: &'static str, e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => {
                warn!(operation, not_found = %what, "store lookup missed");
                AppError::NotFound("Conversation not found".into())
            }
            StoreError::Database(e) => {
                error!(operation, error = %e, "store operation failed");
                AppError::Internal(format!("Failed to {operation}"))
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Upstream { status } if *status >= 500 => StatusCode::BAD_GATEWAY,
            AppError::Upstream { .. } => StatusCode::BAD_REQUEST,
            AppError::Misconfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Cancelled => client_closed_request(),
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    /// Not logged here: handlers log failures inside their `operation` span.
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(ErrorResponse {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}

impl From<RelayError> for AppError {
    fn from(e: RelayError) -> Self {
        match e {
            RelayError::Upstream { status } => AppError::Upstream { status },
            RelayError::Cancelled => AppError::Cancelled,
            RelayError::Transport(e) => {
                error!(operation = "relay chat completion", error = %e, "upstream transport failed");
                AppError::Internal("Chat request failed".into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(AppError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Misconfigured("x".into()).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(AppError::Cancelled.status().as_u16(), 499);
        assert_eq!(
            AppError::Internal("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn upstream_status_class_decides_502_or_400() {
        assert_eq!(AppError::Upstream { status: 503 }.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(AppError::Upstream { status: 500 }.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(AppError::Upstream { status: 404 }.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Upstream { status: 429 }.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn store_errors_hide_database_details() {
        let err = AppError::store("list conversations", StoreError::Database(sqlx::Error::PoolTimedOut));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Failed to list conversations");

        let err = AppError::store("get conversation", StoreError::NotFound("conversation c1".into()));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Conversation not found");
    }

    #[tokio::test]
    async fn body_is_error_envelope() {
        let response = AppError::Validation("Missing or invalid title".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let json: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(json, serde_json::json!({"error": "Missing or invalid title"}));
    }
}
