//! SendGrid v3 mail client.
//!
//! Sends one plain-text message per call through `POST /v3/mail/send`.
//! Reference: https://www.twilio.com/docs/sendgrid/api-reference/mail-send/mail-send

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{error, info};

use super::{EmailSender, Notification, SendError};

/// Path of the mail send endpoint, relative to the API base URL.
const MAIL_SEND_PATH: &str = "/v3/mail/send";

/// Longest provider error body kept in a [`SendError::Provider`].
const MAX_ERROR_BODY: usize = 500;

/// SendGrid API client.
#[derive(Clone)]
pub struct SendGridClient {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl SendGridClient {
    /// Create a client for the given API key and base URL.
    pub fn new(api_key: impl Into<String>, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), MAIL_SEND_PATH),
        }
    }
}

// =============================================================================
// Request Body
// =============================================================================

#[derive(Serialize)]
struct MailSendRequest<'a> {
    personalizations: [Personalization<'a>; 1],
    from: Address<'a>,
    subject: &'a str,
    content: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Personalization<'a> {
    to: [Address<'a>; 1],
}

#[derive(Serialize)]
struct Address<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    content_type: &'a str,
    value: &'a str,
}

impl<'a> From<&'a Notification> for MailSendRequest<'a> {
    fn from(n: &'a Notification) -> Self {
        MailSendRequest {
            personalizations: [Personalization {
                to: [Address { email: &n.to }],
            }],
            from: Address { email: &n.from },
            subject: &n.subject,
            content: [Content {
                content_type: "text/plain",
                value: &n.text,
            }],
        }
    }
}

#[async_trait]
impl EmailSender for SendGridClient {
    async fn send(&self, notification: &Notification) -> Result<(), SendError> {
        info!(
            to = %notification.to,
            subject = %notification.subject,
            text_length = notification.text.len(),
            "sendgrid_send_starting"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&MailSendRequest::from(notification))
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, is_timeout = e.is_timeout(), "sendgrid_request_error");
                SendError::Http(e)
            })?;

        let status = response.status();
        if status.is_success() {
            info!(status_code = status.as_u16(), "sendgrid_send_complete");
            return Ok(());
        }

        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }

        error!(
            status_code = status.as_u16(),
            body = %body,
            "sendgrid_send_rejected"
        );

        Err(SendError::Provider {
            status: status.as_u16(),
            body,
        })
    }
}
