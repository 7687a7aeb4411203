//! Error types for the control interface.
//!
//! [`ControlApiError`] converts into an Axum response with a JSON body
//! of the form `{ "error": ..., "status": ... }`.

use aeon_core::ControlError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Errors that can occur in the control API layer.
#[derive(Debug, thiserror::Error)]
pub enum ControlApiError {
    /// The route does not exist in this mode.
    #[error("not found: {0}")]
    NotFound(String),

    /// The forced cycle could not run.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ControlError> for ControlApiError {
    fn from(err: ControlError) -> Self {
        match err {
            ControlError::TestModeDisabled => Self::NotFound(err.to_string()),
            ControlError::Scheduler { .. } => Self::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for ControlApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
