//! Drawing operations and strokes.
//!
//! Coordinates are normalized to `[0, 1]` of the canvas width/height so every
//! client can denormalize against its own surface size. The same payload
//! structs travel in three places: inbound `draw` requests (no user/timestamp
//! yet), the server's raw operation log (stamped), and outbound `draw` events.

use serde::{Deserialize, Deserializer, Serialize};

use crate::UserId;

/// Drawing tool carried by begin/draw operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    #[default]
    Pencil,
    /// Removes pixels; rendered at twice the brush size.
    Eraser,
}

// =============================================================================
// OPERATION PAYLOADS
// =============================================================================

/// Pointer-down: opens a stroke for `user_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrokeBegin {
    #[serde(default, deserialize_with = "lenient_user_id", skip_serializing_if = "UserId::is_nil")]
    pub user_id: UserId,
    pub tool: Tool,
    pub color: String,
    pub size: f64,
    pub from_x: f64,
    pub from_y: f64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub timestamp: i64,
}

/// One line segment of a stroke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    #[serde(default, deserialize_with = "lenient_user_id", skip_serializing_if = "UserId::is_nil")]
    pub user_id: UserId,
    pub tool: Tool,
    pub color: String,
    pub size: f64,
    pub from_x: f64,
    pub from_y: f64,
    pub to_x: f64,
    pub to_y: f64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub timestamp: i64,
}

/// Payload-free marker used by `stroke_end` and `clear`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Mark {
    #[serde(deserialize_with = "lenient_user_id", skip_serializing_if = "UserId::is_nil")]
    pub user_id: UserId,
    #[serde(skip_serializing_if = "is_zero")]
    pub timestamp: i64,
}

/// Senders' `userId`s are replaced when the server stamps an operation, so
/// one that is not a UUID reads as nil rather than rejecting the payload.
fn lenient_user_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<UserId, D::Error> {
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .and_then(|text| UserId::parse_str(text).ok())
        .unwrap_or_default())
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_zero(value: &i64) -> bool {
    *value == 0
}

// =============================================================================
// OPERATION
// =============================================================================

/// A recorded drawing operation, as kept in the server's raw operation list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    StrokeBegin(StrokeBegin),
    Draw(Segment),
    StrokeEnd(Mark),
    Clear(Mark),
}

impl Operation {
    /// The user who issued this operation.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        match self {
            Self::StrokeBegin(begin) => begin.user_id,
            Self::Draw(segment) => segment.user_id,
            Self::StrokeEnd(mark) | Self::Clear(mark) => mark.user_id,
        }
    }

    #[must_use]
    pub fn timestamp(&self) -> i64 {
        match self {
            Self::StrokeBegin(begin) => begin.timestamp,
            Self::Draw(segment) => segment.timestamp,
            Self::StrokeEnd(mark) | Self::Clear(mark) => mark.timestamp,
        }
    }

    /// Overwrite the issuing user and timestamp. The server never trusts
    /// client-supplied values for either.
    #[must_use]
    pub fn stamped(mut self, user_id: UserId, timestamp: i64) -> Self {
        match &mut self {
            Self::StrokeBegin(begin) => {
                begin.user_id = user_id;
                begin.timestamp = timestamp;
            }
            Self::Draw(segment) => {
                segment.user_id = user_id;
                segment.timestamp = timestamp;
            }
            Self::StrokeEnd(mark) | Self::Clear(mark) => {
                mark.user_id = user_id;
                mark.timestamp = timestamp;
            }
        }
        self
    }
}

// =============================================================================
// STROKE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrokeKind {
    /// A pointer-down to pointer-up gesture.
    Stroke,
    /// Synthetic marker recorded by `clear`.
    Clear,
}

/// One user's aggregated gesture: the unit of undo/redo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stroke {
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub kind: StrokeKind,
    #[serde(default)]
    pub operations: Vec<Segment>,
    pub timestamp: i64,
}

impl Stroke {
    /// Open an empty stroke from its begin operation.
    #[must_use]
    pub fn open(begin: &StrokeBegin) -> Self {
        Self { user_id: begin.user_id, kind: StrokeKind::Stroke, operations: Vec::new(), timestamp: begin.timestamp }
    }

    /// The synthetic marker a `clear` leaves behind.
    #[must_use]
    pub fn clear_marker(mark: &Mark) -> Self {
        Self { user_id: mark.user_id, kind: StrokeKind::Clear, operations: Vec::new(), timestamp: mark.timestamp }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

// =============================================================================
// DRAW PAYLOADS
// =============================================================================

/// Inbound `draw` payload, client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DrawRequest {
    StrokeBegin(StrokeBegin),
    Draw(Segment),
    StrokeEnd(Mark),
    Clear(Mark),
    Undo,
    Redo,
}

impl DrawRequest {
    /// The recordable operation, or `None` for the undo/redo control requests.
    #[must_use]
    pub fn into_operation(self) -> Option<Operation> {
        match self {
            Self::StrokeBegin(begin) => Some(Operation::StrokeBegin(begin)),
            Self::Draw(segment) => Some(Operation::Draw(segment)),
            Self::StrokeEnd(mark) => Some(Operation::StrokeEnd(mark)),
            Self::Clear(mark) => Some(Operation::Clear(mark)),
            Self::Undo | Self::Redo => None,
        }
    }
}

/// Outbound `draw` payload, server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum DrawEvent {
    StrokeBegin(StrokeBegin),
    Draw(Segment),
    StrokeEnd(Mark),
    Clear(Mark),
    Undo { user_id: UserId, undone_stroke: Stroke },
    Redo { user_id: UserId, redone_stroke: Stroke },
}

impl DrawEvent {
    #[must_use]
    pub fn user_id(&self) -> UserId {
        match self {
            Self::StrokeBegin(begin) => begin.user_id,
            Self::Draw(segment) => segment.user_id,
            Self::StrokeEnd(mark) | Self::Clear(mark) => mark.user_id,
            Self::Undo { user_id, .. } | Self::Redo { user_id, .. } => *user_id,
        }
    }

    /// Clear, undo, and redo mutate shared history; their echo is authoritative
    /// even for the client that issued them.
    #[must_use]
    pub fn is_shared_history(&self) -> bool {
        matches!(self, Self::Clear(_) | Self::Undo { .. } | Self::Redo { .. })
    }
}

impl From<Operation> for DrawEvent {
    fn from(op: Operation) -> Self {
        match op {
            Operation::StrokeBegin(begin) => Self::StrokeBegin(begin),
            Operation::Draw(segment) => Self::Draw(segment),
            Operation::StrokeEnd(mark) => Self::StrokeEnd(mark),
            Operation::Clear(mark) => Self::Clear(mark),
        }
    }
}
