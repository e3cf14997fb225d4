//! Call Notifier - ElevenLabs call webhooks to email.
//!
//! Receives signed webhook events from ElevenLabs Conversational AI and
//! emails a summary of each finished call through SendGrid.
//!
//! ## Architecture
//!
//! ```text
//! ElevenLabs → Web Server → signature check → event filter → SendGrid
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod notify;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use error::WebhookError;
pub use event::{CallData, EventKind, TranscriptTurn, WebhookEvent};
pub use notify::{EmailSender, Notification, SendError, SendGridClient};
pub use web::{router, AppState};
