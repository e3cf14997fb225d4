//! Call notification formatting.
//!
//! Turns the `data` object of an accepted webhook into the plain-text email
//! that gets sent to the configured recipient.

use serde::Serialize;
use tracing::info;

use crate::event::{CallData, TranscriptTurn};

/// Subject line of every call notification.
pub const NOTIFICATION_SUBJECT: &str = "New call from your AI agent";

/// Placeholder used when the payload carries no phone number.
pub const UNKNOWN_PHONE: &str = "Unknown";

/// A single plain-text email ready to hand to an [`EmailSender`](super::EmailSender).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// Recipient address
    pub to: String,
    /// Sender address
    pub from: String,
    /// Subject line
    pub subject: String,
    /// Plain-text body
    pub text: String,
}

/// Pick the phone number to report.
///
/// Checks `from`, `to` and `phone_number` in that order and returns the
/// first non-empty value, or `"Unknown"`.
pub fn extract_phone(data: &CallData) -> &str {
    [&data.from_number, &data.to_number, &data.phone_number]
        .into_iter()
        .filter_map(|field| field.as_deref())
        .find(|value| !value.is_empty())
        .unwrap_or(UNKNOWN_PHONE)
}

/// Render transcript turns as `role: message` lines in call order.
///
/// A missing role or message renders as an empty string.
pub fn render_transcript(turns: &[TranscriptTurn]) -> String {
    turns
        .iter()
        .map(|turn| {
            format!(
                "{}: {}",
                turn.role.as_deref().unwrap_or(""),
                turn.message.as_deref().unwrap_or("")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the notification for an accepted call event.
pub fn build_notification(data: &CallData, to: &str, from: &str) -> Notification {
    let phone = extract_phone(data);
    let turns = data.transcript.as_deref().unwrap_or_default();
    let transcript = render_transcript(turns);

    let text = format!(
        "You have a new call from your AI agent.\n\nPhone number: {}\n\nTranscript:\n{}",
        phone, transcript
    )
    .trim()
    .to_string();

    info!(
        conversation_id = ?data.conversation_id,
        phone = %phone,
        transcript_turns = turns.len(),
        text_length = text.len(),
        "notification_built"
    );

    Notification {
        to: to.to_string(),
        from: from.to_string(),
        subject: NOTIFICATION_SUBJECT.to_string(),
        text,
    }
}
