//! Error types and error handling for the application
//!
//! This module defines the caller-visible error type. Agent failures never
//! surface here — they are absorbed by the coordinator into the run's error
//! log (see `coordinator`). Only request validation problems, unknown trace
//! sessions, and run-fatal internal faults become HTTP errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error types
///
/// Each variant implements automatic conversion to an HTTP response via
/// `IntoResponse`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Request failed validation before the coordinator was invoked
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// No trace exists for the given session id
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Operation timed out
    #[error("Timeout: {0}")]
    #[allow(dead_code)] // Per-agent timeouts are absorbed; kept for run-level callers
    Timeout(String),

    /// Internal server error (catch-all for run-fatal faults)
    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::SessionNotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::Timeout(_) => (StatusCode::REQUEST_TIMEOUT, self.to_string()),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_request_maps_to_400() {
        let response = AppError::InvalidRequest("budget_min > budget_max".to_string())
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_session_not_found_maps_to_404() {
        let response = AppError::SessionNotFound("abc123".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_internal_maps_to_500() {
        let response =
            AppError::Internal(anyhow::anyhow!("unexpected fault")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
