//! Outbound notification module.
//!
//! This module provides:
//! - Formatting of accepted call events into a plain-text [`Notification`]
//! - The [`EmailSender`] seam and its SendGrid implementation
//!
//! ## Flow
//!
//! ```text
//! CallData → build_notification() → Notification → EmailSender::send()
//! ```

pub mod format;
pub mod sendgrid;

use async_trait::async_trait;
use thiserror::Error;

pub use format::{build_notification, extract_phone, render_transcript, Notification};
pub use sendgrid::SendGridClient;

/// Failure to deliver a notification.
#[derive(Debug, Error)]
pub enum SendError {
    /// The request never produced a response
    #[error("email provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status
    #[error("email provider returned {status}: {body}")]
    Provider { status: u16, body: String },
}

/// Something that can deliver one notification.
///
/// Implementations make a single attempt; retrying is left to the caller.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), SendError>;
}
