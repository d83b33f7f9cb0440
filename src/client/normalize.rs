//! Normalization of upstream failures
//!
//! Whatever went wrong (an HTTP error status, a dropped connection, a
//! fallback transport that produced garbage) ends up as a [`NormalizedError`]
//! with the same four fields, so the retry loop and the user-facing message
//! never need to know which upstream or transport produced it.

use std::fmt;

use reqwest::StatusCode;
use serde_json::Value;

use super::Side;
use super::transport::{TransportError, TransportErrorKind};
use crate::mask::SecretMasker;

/// Status reported when the fallback transport could not produce a usable
/// response; it keeps the failure inside the transient set.
pub const SYNTHESIZED_STATUS: u16 = 503;

/// Body fields searched for a human-readable message, in order
const MESSAGE_FIELDS: [&str; 3] = ["message", "error", "error_description"];

/// What kind of failure a [`NormalizedError`] describes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The upstream answered with an error status
    Http,
    /// The connection was reset, truncated or failed TLS negotiation
    ConnectionAnomaly,
    /// Any other failure to obtain a response (refused, timed out, DNS)
    Transport,
}

/// A single failed attempt, before normalization
#[derive(Debug, Clone)]
pub enum Failure {
    /// A response outside the 2xx range
    Status { status: u16, body: String },
    /// No response was obtained
    Transport(TransportError),
    /// The fallback transport failed to resolve a connection anomaly
    Synthesized { reason: String },
}

impl Failure {
    /// Whether this failure should trigger the fallback transport
    pub fn is_connection_anomaly(&self) -> bool {
        matches!(
            self,
            Failure::Transport(TransportError {
                kind: TransportErrorKind::ConnectionAnomaly,
                ..
            })
        )
    }
}

/// Uniform failure record shared by both upstreams
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedError {
    pub side: Side,
    /// Request URL with secrets masked
    pub endpoint: String,
    /// HTTP status, or 0 when no response was obtained
    pub status: u16,
    pub message: String,
    pub kind: FailureKind,
}

impl fmt::Display for NormalizedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.status == 0 {
            write!(
                f,
                "[{}] {} failed without an HTTP response: {}",
                self.side, self.endpoint, self.message
            )
        } else {
            write!(
                f,
                "[{}] {} failed with HTTP {}: {}",
                self.side, self.endpoint, self.status, self.message
            )
        }
    }
}

impl std::error::Error for NormalizedError {}

/// Convert a failed attempt into a [`NormalizedError`]. Never fails.
pub fn normalize(
    failure: &Failure,
    side: Side,
    endpoint: &str,
    masker: &SecretMasker,
) -> NormalizedError {
    let (status, message, kind) = match failure {
        Failure::Status { status, body } => {
            let message = message_from_body(body).unwrap_or_else(|| status_message(*status));
            (*status, message, FailureKind::Http)
        }
        Failure::Transport(err) => {
            let kind = match err.kind {
                TransportErrorKind::ConnectionAnomaly => FailureKind::ConnectionAnomaly,
                TransportErrorKind::Timeout | TransportErrorKind::Other => FailureKind::Transport,
            };
            (0, err.message.clone(), kind)
        }
        Failure::Synthesized { reason } => (
            SYNTHESIZED_STATUS,
            reason.clone(),
            FailureKind::ConnectionAnomaly,
        ),
    };

    NormalizedError {
        side,
        endpoint: masker.mask(endpoint).into_owned(),
        status,
        message: masker.mask(&message).into_owned(),
        kind,
    }
}

/// Pull the first usable message field out of a JSON error body
pub fn message_from_body(body: &str) -> Option<String> {
    let parsed: Value = serde_json::from_str(body.trim()).ok()?;
    let object = parsed.as_object()?;

    MESSAGE_FIELDS.iter().find_map(|field| match object.get(*field)? {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.trim().to_string()),
        // GitLab validation errors: {"message": {"name": ["has already been taken"]}}
        other => Some(other.to_string()),
    })
}

fn status_message(status: u16) -> String {
    let reason = StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason());
    match reason {
        Some(reason) => format!("HTTP {} {}", status, reason),
        None => format!("HTTP {}", status),
    }
}
