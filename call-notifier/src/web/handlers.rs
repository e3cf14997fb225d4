//! Webhook endpoint handlers.
//!
//! The ElevenLabs handler runs the whole pipeline inline:
//! 1. Verify the HMAC signature over the raw body
//! 2. Parse the payload and filter on event kind
//! 3. Build and send the notification email
//!
//! Nothing is queued or retried; the response status reports the outcome.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::WebhookError;
use crate::event::WebhookEvent;
use crate::notify::{build_notification, EmailSender};
use crate::web::signature::{
    is_timestamp_fresh, parse_signature_header, verify_signature_header, SIGNATURE_HEADER,
};
use crate::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub mailer: Arc<dyn EmailSender>,
}

impl AppState {
    pub fn new(config: Config, mailer: Arc<dyn EmailSender>) -> Self {
        Self {
            config: Arc::new(config),
            mailer,
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// ElevenLabs Webhook
// =============================================================================

/// ElevenLabs webhook endpoint.
///
/// Responds with:
/// - `401` when the signature is missing, malformed, wrong or stale
/// - `400` when a correctly signed body is not valid JSON
/// - `204` for event kinds that do not trigger a notification
/// - `200` once the notification has been accepted by the email provider
/// - `500` when the email provider rejects or cannot be reached
pub async fn elevenlabs_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, WebhookError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    info!(
        body_length = body.len(),
        has_signature = !signature.is_empty(),
        "elevenlabs_webhook_received"
    );

    let parsed = match parse_signature_header(signature) {
        Some(p) => p,
        None => {
            error!(header_length = signature.len(), "elevenlabs_signature_malformed_header");
            return Err(WebhookError::InvalidSignature);
        }
    };

    if !verify_signature_header(&state.config.webhook_secret, &parsed, &body) {
        error!("elevenlabs_signature_invalid");
        return Err(WebhookError::InvalidSignature);
    }

    if let Some(max_age) = state.config.signature_max_age {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        if !is_timestamp_fresh(parsed.timestamp, max_age, now) {
            error!(max_age_seconds = max_age, "elevenlabs_signature_expired");
            return Err(WebhookError::InvalidSignature);
        }
    }

    let event: WebhookEvent = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "elevenlabs_payload_invalid");
        WebhookError::InvalidPayload(e.to_string())
    })?;

    let kind = event.kind();
    if !kind.triggers_notification() {
        info!(event = %kind.as_str(), "elevenlabs_event_ignored");
        return Ok(StatusCode::NO_CONTENT);
    }

    let data = event.call_data();
    let notification = build_notification(
        &data,
        &state.config.notify_to,
        &state.config.notify_from,
    );

    if let Err(e) = state.mailer.send(&notification).await {
        error!(
            error = %e,
            conversation_id = ?data.conversation_id,
            "notification_send_failed"
        );
        return Err(WebhookError::Delivery(e));
    }

    info!(
        event = %kind.as_str(),
        conversation_id = ?data.conversation_id,
        to = %notification.to,
        "notification_sent"
    );

    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use axum::{body::Body, http::Request, Router};
    use tower::ServiceExt;

    use super::*;
    use crate::notify::{Notification, SendError};
    use crate::web::router;
    use crate::web::signature::compute_signature;

    const SECRET: &str = "wsec_test_secret";
    const NOTIFY_TO: &str = "owner@example.com";

    /// Records every notification instead of sending it.
    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<Notification>>,
        fail: bool,
    }

    #[async_trait]
    impl EmailSender for RecordingSender {
        async fn send(&self, notification: &Notification) -> Result<(), SendError> {
            self.sent.lock().unwrap().push(notification.clone());
            if self.fail {
                return Err(SendError::Provider {
                    status: 503,
                    body: "unavailable".to_string(),
                });
            }
            Ok(())
        }
    }

    fn test_config(signature_max_age: Option<u64>) -> Config {
        Config {
            port: 3000,
            webhook_secret: SECRET.to_string(),
            signature_max_age,
            sendgrid_api_key: "SG.test-key".to_string(),
            sendgrid_api_url: "http://127.0.0.1:9".to_string(),
            notify_to: NOTIFY_TO.to_string(),
            notify_from: "info@eboxlab.com".to_string(),
        }
    }

    fn test_app(sender: Arc<RecordingSender>, signature_max_age: Option<u64>) -> Router {
        router(AppState::new(test_config(signature_max_age), sender))
    }

    fn now_secs() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
    }

    fn signed_request(path: &str, body: &str, timestamp: &str) -> Request<Body> {
        let digest = compute_signature(SECRET, timestamp, body.as_bytes());
        Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .header("ElevenLabs-Signature", format!("t={},v0={}", timestamp, digest))
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    const TRANSCRIPTION_BODY: &str = r#"{
        "type": "post_call_transcription",
        "data": {
            "conversation_id": "conv_123",
            "from": "+15550100",
            "to": "+15550199",
            "transcript": [
                {"role": "agent", "message": "hi"},
                {"role": "user", "message": "hello"}
            ]
        }
    }"#;

    #[tokio::test]
    async fn test_health() {
        let app = test_app(Arc::new(RecordingSender::default()), None);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_transcription_sends_one_email() {
        let sender = Arc::new(RecordingSender::default());
        let app = test_app(sender.clone(), None);

        let response = app
            .oneshot(signed_request("/", TRANSCRIPTION_BODY, "1700000000"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, NOTIFY_TO);
        assert_eq!(sent[0].from, "info@eboxlab.com");
        assert_eq!(sent[0].subject, "New call from your AI agent");
        assert!(sent[0].text.contains("Phone number: +15550100"));
        assert!(sent[0].text.ends_with("agent: hi\nuser: hello"));
    }

    #[tokio::test]
    async fn test_webhook_path_alias() {
        let sender = Arc::new(RecordingSender::default());
        let app = test_app(sender.clone(), None);

        let body = r#"{"event": "call.finished", "data": {"phone_number": "+15550123"}}"#;
        let response = app
            .oneshot(signed_request("/webhook/elevenlabs", body, "1700000000"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].text.contains("Phone number: +15550123"));
    }

    #[tokio::test]
    async fn test_unknown_event_is_ignored() {
        let sender = Arc::new(RecordingSender::default());
        let app = test_app(sender.clone(), None);

        let body = r#"{"event": "unknown.kind", "data": {"from": "+15550100"}}"#;
        let response = app
            .oneshot(signed_request("/", body, "1700000000"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(sender.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_event_kind_is_ignored() {
        let sender = Arc::new(RecordingSender::default());
        let app = test_app(sender.clone(), None);

        let response = app
            .oneshot(signed_request("/", r#"{"data": {}}"#, "1700000000"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(sender.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_data_uses_placeholders() {
        let sender = Arc::new(RecordingSender::default());
        let app = test_app(sender.clone(), None);

        let response = app
            .oneshot(signed_request("/", r#"{"event": "call.finished"}"#, "1700000000"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let sent = sender.sent.lock().unwrap();
        assert!(sent[0].text.contains("Phone number: Unknown"));
    }

    #[tokio::test]
    async fn test_missing_signature_is_rejected() {
        let sender = Arc::new(RecordingSender::default());
        let app = test_app(sender.clone(), None);

        let request = Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(TRANSCRIPTION_BODY))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(sender.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tampered_body_is_rejected() {
        let sender = Arc::new(RecordingSender::default());
        let app = test_app(sender.clone(), None);

        let digest = compute_signature(SECRET, "1700000000", TRANSCRIPTION_BODY.as_bytes());
        let tampered = TRANSCRIPTION_BODY.replace("+15550100", "+15550666");
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .header("elevenlabs-signature", format!("t=1700000000,v0={}", digest))
            .body(Body::from(tampered))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(sender.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ignored_event_with_odd_data_is_no_content() {
        for body in [
            r#"{"type": "post_call_audio", "data": {"from": 15550100}}"#,
            r#"{"type": "post_call_audio", "data": "abc"}"#,
            r#"{"event": 5}"#,
            r#"{"event": {"kind": "call.finished"}, "data": null}"#,
            "[]",
        ] {
            let sender = Arc::new(RecordingSender::default());
            let app = test_app(sender.clone(), None);

            let response = app
                .oneshot(signed_request("/", body, "1700000000"))
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::NO_CONTENT, "body: {}", body);
            assert!(sender.sent.lock().unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_numeric_phone_is_reported() {
        let sender = Arc::new(RecordingSender::default());
        let app = test_app(sender.clone(), None);

        let body = r#"{"event": "call.finished", "data": {"from": 15550100}}"#;
        let response = app
            .oneshot(signed_request("/", body, "1700000000"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].text.contains("Phone number: 15550100"));
    }

    #[tokio::test]
    async fn test_null_role_still_sends() {
        let sender = Arc::new(RecordingSender::default());
        let app = test_app(sender.clone(), None);

        let body = r#"{"event": "call.finished", "data": {"transcript": [{"role": null, "message": "hi"}]}}"#;
        let response = app
            .oneshot(signed_request("/", body, "1700000000"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].text.ends_with("Transcript:\n: hi"));
    }

    #[tokio::test]
    async fn test_non_object_data_sends_placeholder() {
        let sender = Arc::new(RecordingSender::default());
        let app = test_app(sender.clone(), None);

        let body = r#"{"event": "call.finished", "data": "abc"}"#;
        let response = app
            .oneshot(signed_request("/", body, "1700000000"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let sent = sender.sent.lock().unwrap();
        assert!(sent[0].text.contains("Phone number: Unknown"));
    }

    #[tokio::test]
    async fn test_invalid_json_is_bad_request() {
        let sender = Arc::new(RecordingSender::default());
        let app = test_app(sender.clone(), None);

        let response = app
            .oneshot(signed_request("/", "{not json", "1700000000"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(sender.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_send_failure_is_server_error() {
        let sender = Arc::new(RecordingSender {
            fail: true,
            ..Default::default()
        });
        let app = test_app(sender.clone(), None);

        let response = app
            .oneshot(signed_request("/", TRANSCRIPTION_BODY, "1700000000"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        // One attempt, no retry.
        assert_eq!(sender.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_stale_timestamp_rejected_when_window_configured() {
        let sender = Arc::new(RecordingSender::default());
        let app = test_app(sender.clone(), Some(300));

        let response = app
            .oneshot(signed_request("/", TRANSCRIPTION_BODY, "946684800"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(sender.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fresh_timestamp_accepted_when_window_configured() {
        let sender = Arc::new(RecordingSender::default());
        let app = test_app(sender.clone(), Some(300));

        let timestamp = now_secs().to_string();
        let response = app
            .oneshot(signed_request("/", TRANSCRIPTION_BODY, &timestamp))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(sender.sent.lock().unwrap().len(), 1);
    }
}
