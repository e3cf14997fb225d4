//! Request-level errors and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::notify::SendError;

/// Why a webhook request was not handled successfully.
///
/// The response body never says more than the status already does, so an
/// attacker learns nothing about which signature check failed.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
    #[error("notification delivery failed: {0}")]
    Delivery(#[from] SendError),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        match self {
            WebhookError::InvalidSignature => {
                (StatusCode::UNAUTHORIZED, "Invalid signature").into_response()
            }
            WebhookError::InvalidPayload(_) => {
                (StatusCode::BAD_REQUEST, "Invalid payload").into_response()
            }
            WebhookError::Delivery(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}
