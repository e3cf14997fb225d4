//! ElevenLabs webhook signature verification.
//!
//! ElevenLabs signs webhook requests using HMAC-SHA256 and sends the result
//! in the `elevenlabs-signature` header as `t=<timestamp>,v0=<hex digest>`.
//! The digest covers `<timestamp>.<raw request body>`.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Name of the header carrying the signature.
pub const SIGNATURE_HEADER: &str = "elevenlabs-signature";

/// The two fields of an `elevenlabs-signature` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader<'a> {
    /// Timestamp string exactly as sent (`t=` field)
    pub timestamp: &'a str,
    /// Claimed hex digest (`v0=` field)
    pub digest: &'a str,
}

/// Split a signature header into its timestamp and digest fields.
///
/// The header is split on `,`; the first part must start with `t=` and the
/// second with `v0=`. Returns `None` when either field is missing, empty or
/// lacks its prefix. Anything after the second part is ignored.
pub fn parse_signature_header(header: &str) -> Option<SignatureHeader<'_>> {
    let mut parts = header.split(',');
    let timestamp = parts.next()?.strip_prefix("t=")?;
    let digest = parts.next()?.strip_prefix("v0=")?;

    if timestamp.is_empty() || digest.is_empty() {
        return None;
    }

    Some(SignatureHeader { timestamp, digest })
}

fn signed_digest(secret: &str, timestamp: &str, body: &[u8]) -> Option<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(body);
    Some(mac.finalize().into_bytes().to_vec())
}

/// Compute the lowercase hex `v0` digest the way ElevenLabs signs requests.
#[cfg(test)]
pub(crate) fn compute_signature(secret: &str, timestamp: &str, body: &[u8]) -> String {
    hex::encode(signed_digest(secret, timestamp, body).unwrap())
}

/// Verify an ElevenLabs webhook signature.
///
/// # Arguments
///
/// * `secret` - The webhook secret shared with ElevenLabs
/// * `header` - Value of the `elevenlabs-signature` header
/// * `body` - The raw request body, byte for byte as received
///
/// # Returns
///
/// `true` if the header carries a digest matching the body, `false` for any
/// mismatch or malformed input. This function never errors.
pub fn verify_elevenlabs_signature(secret: &str, header: &str, body: &[u8]) -> bool {
    match parse_signature_header(header) {
        Some(parsed) => verify_signature_header(secret, &parsed, body),
        None => {
            warn!(
                header_length = header.len(),
                "elevenlabs_signature_malformed_header"
            );
            false
        }
    }
}

/// Verify an already parsed signature header against the raw body.
pub fn verify_signature_header(secret: &str, header: &SignatureHeader<'_>, body: &[u8]) -> bool {
    let claimed = match hex::decode(header.digest) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "elevenlabs_signature_invalid_hex");
            return false;
        }
    };

    let expected = match signed_digest(secret, header.timestamp, body) {
        Some(d) => d,
        None => {
            warn!("elevenlabs_signature_invalid_key");
            return false;
        }
    };

    // Constant-time comparison to prevent timing attacks
    let valid = constant_time_compare(&expected, &claimed);

    if !valid {
        warn!(
            expected_length = expected.len(),
            actual_length = claimed.len(),
            "elevenlabs_signature_mismatch"
        );
    }

    valid
}

/// Check whether a signature timestamp lies within `max_age_seconds` of `now`.
///
/// Both directions count, so timestamps from a skewed clock in the future
/// are held to the same window. Unparsable timestamps are never fresh.
pub fn is_timestamp_fresh(timestamp: &str, max_age_seconds: u64, now: u64) -> bool {
    let webhook_time: u64 = match timestamp.parse() {
        Ok(t) => t,
        Err(_) => {
            warn!(timestamp = %timestamp, "elevenlabs_signature_invalid_timestamp");
            return false;
        }
    };

    let age = now.abs_diff(webhook_time);

    if age > max_age_seconds {
        warn!(
            webhook_time = webhook_time,
            current_time = now,
            age_seconds = age,
            max_age_seconds = max_age_seconds,
            "elevenlabs_signature_stale"
        );
        return false;
    }

    true
}

/// Constant-time byte comparison to prevent timing attacks.
///
/// Every byte pair is visited regardless of where the first difference is.
/// Inputs of unequal length compare unequal without inspecting content.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
