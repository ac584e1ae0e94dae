//! Unified error handling for the relay's HTTP surface.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::services::DispatchError;
use crate::slack::SlackError;

/// Application-level error type returned by route handlers.
///
/// Every variant renders as `{"ok": false, "error": "..."}`.
#[derive(Debug, Error)]
pub enum AppError {
    /// The request was well-formed but semantically invalid.
    #[error("{0}")]
    Validation(String),

    /// Missing or incorrect credential.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An upstream service failed while serving a synchronous request.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DispatchError> for AppError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::InvalidRequest(msg) => Self::Validation(msg),
            DispatchError::Upstream(e) => Self::Upstream(e.to_string()),
            DispatchError::Token(e) => Self::Internal(e.to_string()),
        }
    }
}

impl From<SlackError> for AppError {
    fn from(err: SlackError) -> Self {
        match err {
            SlackError::InvalidSignature(msg) => Self::Unauthorized(msg),
            SlackError::InvalidPayload(msg) => Self::BadRequest(msg),
            other => Self::Upstream(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log server errors with Sentry
        if matches!(self, Self::Internal(_) | Self::Upstream(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Relay request error"
            );
        }

        let status = match &self {
            Self::Internal(_) | Self::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Internal(_) | Self::Upstream(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        };

        (status, Json(json!({ "ok": false, "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::Validation("approverAddresses must not be empty".to_string());
        assert_eq!(err.to_string(), "approverAddresses must not be empty");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(AppError::Validation("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Upstream("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_invalid_signature_maps_to_unauthorized() {
        let err: AppError = SlackError::InvalidSignature("Signature mismatch".into()).into();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }
}
