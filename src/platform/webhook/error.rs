use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Request-level webhook failures. Per-mention failures never surface here.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("invalid verification token")]
    InvalidVerifyToken,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

impl WebhookError {
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidVerifyToken | Self::InvalidSignature => StatusCode::FORBIDDEN,
            Self::InvalidPayload(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            Self::InvalidVerifyToken => (status, "Invalid verification token").into_response(),
            Self::InvalidSignature => (status, "Invalid signature").into_response(),
            // Parser details stay in the logs
            Self::InvalidPayload(_) => (status, Json(json!({"status": "error"}))).into_response(),
        }
    }
}
