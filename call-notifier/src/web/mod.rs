//! Web server module for handling inbound webhooks.
//!
//! This module provides the HTTP surface of the notifier:
//! - `POST /` and `POST /webhook/elevenlabs` receive ElevenLabs call events
//! - `GET /health` answers liveness probes

pub mod handlers;
pub mod signature;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use handlers::{elevenlabs_webhook, health, AppState, HealthResponse};
pub use signature::{
    is_timestamp_fresh, parse_signature_header, verify_elevenlabs_signature,
    verify_signature_header, SignatureHeader, SIGNATURE_HEADER,
};

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/", post(elevenlabs_webhook))
        .route("/webhook/elevenlabs", post(elevenlabs_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
