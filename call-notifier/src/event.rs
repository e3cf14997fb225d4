//! ElevenLabs webhook payload types.
//!
//! Only the fields needed to build a notification are modelled; anything
//! else in the payload is ignored during deserialization.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Event tag sent when a call has ended.
pub const CALL_FINISHED: &str = "call.finished";

/// Event tag sent once the post-call transcript is available.
pub const POST_CALL_TRANSCRIPTION: &str = "post_call_transcription";

// =============================================================================
// Event Kind
// =============================================================================

/// Discriminator of a webhook payload.
///
/// The provider's set of event kinds is open, so anything not listed here
/// lands in [`EventKind::Other`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// `call.finished`
    CallFinished,
    /// `post_call_transcription`
    PostCallTranscription,
    /// Any other tag
    Other(String),
    /// Neither `event` nor `type` was present
    Missing,
}

impl EventKind {
    /// Map a raw tag to its kind. Empty tags count as missing.
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag {
            None | Some("") => EventKind::Missing,
            Some(CALL_FINISHED) => EventKind::CallFinished,
            Some(POST_CALL_TRANSCRIPTION) => EventKind::PostCallTranscription,
            Some(other) => EventKind::Other(other.to_string()),
        }
    }

    /// Whether this kind of event results in an email.
    pub fn triggers_notification(&self) -> bool {
        matches!(
            self,
            EventKind::CallFinished | EventKind::PostCallTranscription
        )
    }

    /// The tag as it appeared on the wire, for logging.
    pub fn as_str(&self) -> &str {
        match self {
            EventKind::CallFinished => CALL_FINISHED,
            EventKind::PostCallTranscription => POST_CALL_TRANSCRIPTION,
            EventKind::Other(tag) => tag,
            EventKind::Missing => "",
        }
    }
}

// =============================================================================
// Payload
// =============================================================================

/// Parsed webhook body.
///
/// ElevenLabs has used both `event` and `type` for the tag; `event` wins
/// when it is set. Tags and `data` stay untyped until the event kind says
/// the payload is worth reading, so ignored events never fail to parse.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookEvent {
    /// Event tag (older payloads)
    #[serde(default)]
    pub event: Option<Value>,
    /// Event tag (current payloads)
    #[serde(default, rename = "type")]
    pub event_type: Option<Value>,
    /// Event-specific data
    #[serde(default)]
    pub data: Option<Value>,
}

impl WebhookEvent {
    /// Resolve the event kind from `event`, falling back to `type`.
    ///
    /// A tag that is not a string never matches a known kind.
    pub fn kind(&self) -> EventKind {
        let tag = self
            .event
            .as_ref()
            .filter(|v| is_set(v))
            .or(self.event_type.as_ref());

        match tag {
            None | Some(Value::Null) => EventKind::Missing,
            Some(Value::String(s)) => EventKind::from_tag(Some(s)),
            Some(other) => EventKind::Other(other.to_string()),
        }
    }

    /// Take the `data` object as typed call metadata.
    ///
    /// Anything other than a JSON object yields empty call data.
    pub fn call_data(self) -> CallData {
        match self.data {
            Some(data @ Value::Object(_)) => serde_json::from_value(data).unwrap_or_default(),
            _ => CallData::default(),
        }
    }
}

/// Whether a tag value counts as present (non-null, non-empty, non-zero, non-false).
fn is_set(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Call metadata carried in the `data` object.
///
/// Every field is read leniently: numbers and booleans become their text,
/// and values of any other shape are treated as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallData {
    /// Caller number
    #[serde(default, rename = "from", deserialize_with = "scalar_string")]
    pub from_number: Option<String>,
    /// Called number
    #[serde(default, rename = "to", deserialize_with = "scalar_string")]
    pub to_number: Option<String>,
    /// Generic phone number field
    #[serde(default, deserialize_with = "scalar_string")]
    pub phone_number: Option<String>,
    /// Conversation identifier
    #[serde(default, deserialize_with = "scalar_string")]
    pub conversation_id: Option<String>,
    /// Conversation turns in call order
    #[serde(default, deserialize_with = "transcript_turns")]
    pub transcript: Option<Vec<TranscriptTurn>>,
}

/// One turn of a call transcript.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TranscriptTurn {
    /// Speaker label, e.g. `agent` or `user`
    #[serde(default, deserialize_with = "scalar_string")]
    pub role: Option<String>,
    /// What was said; `null` for turns that carry only tool calls
    #[serde(default, deserialize_with = "scalar_string")]
    pub message: Option<String>,
}

impl TranscriptTurn {
    fn from_value(value: Value) -> Self {
        match value {
            turn @ Value::Object(_) => serde_json::from_value(turn).unwrap_or_default(),
            _ => TranscriptTurn::default(),
        }
    }
}

fn scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    })
}

fn transcript_turns<'de, D>(deserializer: D) -> Result<Option<Vec<TranscriptTurn>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => Some(items.into_iter().map(TranscriptTurn::from_value).collect()),
        _ => None,
    })
}
