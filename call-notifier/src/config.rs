//! Configuration module for environment variable parsing.
//!
//! All configuration is read once at startup into an immutable [`Config`]
//! that is shared with request handlers through `Arc`.

use std::env;
use std::fmt;

use anyhow::{bail, Result};
use tracing::warn;

/// Sender address used when `NOTIFY_FROM` is not set.
pub const DEFAULT_NOTIFY_FROM: &str = "info@eboxlab.com";

/// SendGrid API base URL used when `SENDGRID_API_URL` is not set.
pub const DEFAULT_SENDGRID_API_URL: &str = "https://api.sendgrid.com";

/// Application configuration loaded from environment variables.
#[derive(Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// ElevenLabs webhook secret used as the HMAC key
    pub webhook_secret: String,

    /// Maximum age in seconds for signature timestamps.
    ///
    /// `None` disables the freshness check entirely.
    pub signature_max_age: Option<u64>,

    /// SendGrid API key
    pub sendgrid_api_key: String,

    /// SendGrid API base URL
    pub sendgrid_api_url: String,

    /// Recipient of every call notification
    pub notify_to: String,

    /// Sender address of every call notification
    pub notify_from: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is loaded first when present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Config {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),

            webhook_secret: required("ELEVENLABS_WEBHOOK_SECRET")?,

            signature_max_age: parse_optional_u64("ELEVENLABS_SIGNATURE_MAX_AGE"),

            sendgrid_api_key: required("SENDGRID_API_KEY")?,

            sendgrid_api_url: env::var("SENDGRID_API_URL")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SENDGRID_API_URL.to_string()),

            notify_to: required("NOTIFY_TO")?,

            notify_from: env::var("NOTIFY_FROM")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_NOTIFY_FROM.to_string()),
        })
    }
}

// Secrets stay out of logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("webhook_secret", &"<redacted>")
            .field("signature_max_age", &self.signature_max_age)
            .field("sendgrid_api_key", &"<redacted>")
            .field("sendgrid_api_url", &self.sendgrid_api_url)
            .field("notify_to", &self.notify_to)
            .field("notify_from", &self.notify_from)
            .finish()
    }
}

/// Read a variable that must be present and non-blank.
fn required(name: &str) -> Result<String> {
    match env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        Ok(_) => bail!("environment variable {name} is empty"),
        Err(_) => bail!("environment variable {name} is not set"),
    }
}

/// Parse an optional unsigned integer, ignoring unparsable values with a warning.
fn parse_optional_u64(name: &str) -> Option<u64> {
    let raw = env::var(name).ok()?;
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    match raw.parse::<u64>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid integer value, ignoring");
            None
        }
    }
}
