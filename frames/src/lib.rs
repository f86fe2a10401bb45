//! Shared wire model for the realtime drawing channel.
//!
//! This crate owns the event vocabulary spoken by both the server and the
//! browser client. Every websocket text message is one JSON object of the
//! form `{"event": "<name>", "data": {...}}`; drawing payloads inside a
//! `draw` event are further tagged by `"type"`.
//!
//! | Module | Role |
//! |--------|------|
//! | [`ops`] | Drawing operations, strokes, and the inbound/outbound `draw` payloads |
//! | [`events`] | Channel events in both directions plus roster/presence types |

pub mod events;
pub mod ops;

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use serde::de::DeserializeOwned;

pub use events::{ClientEvent, Cursor, Member, ServerEvent, UserInfo};
pub use ops::{DrawEvent, DrawRequest, Mark, Operation, Segment, Stroke, StrokeBegin, StrokeKind, Tool};

/// Opaque, session-scoped user identifier.
pub type UserId = uuid::Uuid;

/// Short human-typeable room code.
pub type RoomId = String;

/// Error returned by [`encode`] and [`decode`].
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The text was not valid JSON or did not match any known event shape.
    #[error("failed to decode event: {0}")]
    Decode(#[source] serde_json::Error),
    /// The event could not be serialized.
    #[error("failed to encode event: {0}")]
    Encode(#[source] serde_json::Error),
}

// =============================================================================
// ERROR CODES
// =============================================================================

/// Grepable error code and retryable flag for structured `room_error` events.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

// =============================================================================
// CODEC
// =============================================================================

/// Encode an event into a JSON text frame.
///
/// # Errors
///
/// Returns [`CodecError::Encode`] if serialization fails (non-finite floats).
pub fn encode<T: Serialize>(event: &T) -> Result<String, CodecError> {
    serde_json::to_string(event).map_err(CodecError::Encode)
}

/// Decode a JSON text frame into an event.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] for malformed JSON, unknown event names,
/// and payloads missing required fields.
pub fn decode<T: DeserializeOwned>(text: &str) -> Result<T, CodecError> {
    serde_json::from_str(text).map_err(CodecError::Decode)
}

/// Current time as milliseconds since Unix epoch.
///
/// Not available in the browser; the client engine receives time from its host.
#[must_use]
pub fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
