//! Channel events in both directions.
//!
//! DESIGN
//! ======
//! Events are adjacently tagged: `{"event": "join_room", "data": {"roomId": "K7Q2ZP"}}`.
//! Payload-free events (`create_room`, `request_canvas_state`) omit `data`.
//! Field names are camelCase on the wire.

use serde::{Deserialize, Serialize};

use crate::ops::{DrawEvent, DrawRequest, Operation};
use crate::{ErrorCode, RoomId, UserId};

/// Sentinel coordinate meaning "cursor hidden" (sent for both axes).
pub const HIDDEN_CURSOR: f64 = -1.0;

// =============================================================================
// PRESENCE
// =============================================================================

/// Last known normalized cursor position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cursor {
    pub x: f64,
    pub y: f64,
}

impl Cursor {
    /// Interpret a raw `cursor_move` position; negative coordinates hide the cursor.
    #[must_use]
    pub fn from_wire(x: f64, y: f64) -> Option<Self> {
        if x < 0.0 || y < 0.0 { None } else { Some(Self { x, y }) }
    }
}

/// Display identity assigned on join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub name: String,
    pub color: String,
    pub cursor: Option<Cursor>,
}

/// One roster entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: UserId,
    pub name: String,
    pub color: String,
    pub cursor: Option<Cursor>,
}

// =============================================================================
// CLIENT -> SERVER
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    CreateRoom,
    JoinRoom { room_id: RoomId },
    /// Normalized position, or `(-1, -1)` to hide.
    CursorMove { x: f64, y: f64 },
    Draw(DrawRequest),
    RequestCanvasState,
}

// =============================================================================
// SERVER -> CLIENT
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// First event on every connection.
    Connected { user_id: UserId },
    RoomCreated { room_id: RoomId, user_info: UserInfo, users: Vec<Member> },
    RoomJoined { room_id: RoomId, user_info: UserInfo, users: Vec<Member> },
    RoomError { code: String, message: String },
    UserJoined { user_id: UserId, user_info: UserInfo, users: Vec<Member> },
    UserLeft { user_id: UserId, users: Vec<Member> },
    CursorMove { user_id: UserId, x: f64, y: f64, color: String },
    Draw(DrawEvent),
    /// Raw bounded operation list for late-join reconstruction.
    CanvasState { operations: Vec<Operation> },
}

impl ServerEvent {
    /// Build a structured `room_error` from a typed error.
    #[must_use]
    pub fn room_error(err: &(impl ErrorCode + ?Sized)) -> Self {
        Self::RoomError { code: err.error_code().to_owned(), message: err.to_string() }
    }

    /// Event name as it appears on the wire, for logging.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::RoomCreated { .. } => "room_created",
            Self::RoomJoined { .. } => "room_joined",
            Self::RoomError { .. } => "room_error",
            Self::UserJoined { .. } => "user_joined",
            Self::UserLeft { .. } => "user_left",
            Self::CursorMove { .. } => "cursor_move",
            Self::Draw(_) => "draw",
            Self::CanvasState { .. } => "canvas_state",
        }
    }
}

impl ClientEvent {
    /// Event name as it appears on the wire, for logging.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateRoom => "create_room",
            Self::JoinRoom { .. } => "join_room",
            Self::CursorMove { .. } => "cursor_move",
            Self::Draw(_) => "draw",
            Self::RequestCanvasState => "request_canvas_state",
        }
    }
}
