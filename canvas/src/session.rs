//! Client-side room session: connection status, membership, and presence.
//!
//! DESIGN
//! ======
//! The session is the inbound dispatcher for server events. It keeps the
//! state the UI renders around the canvas (roster, peer cursors, own
//! identity) and turns each event into zero or more [`SessionAction`]s for
//! the host: frames to send, draw events for the [`crate::engine::Engine`],
//! a canvas to rebuild, or a notice to show.
//!
//! Own-echo filtering lives here rather than in the engine. Ordinary draw
//! operations from this user were already painted optimistically, so their
//! echoes are dropped; clear, undo, and redo are always applied because
//! only the server knows their shared-history outcome.

use frames::events::HIDDEN_CURSOR;
use frames::{ClientEvent, DrawEvent, ErrorCode, Member, Operation, RoomId, ServerEvent, UserId, UserInfo};

use crate::presence::{CursorThrottle, Cursors};

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

/// Channel connection status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// Something the host must do in response to a server event or local call.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionAction {
    /// Send a frame to the server.
    Send(ClientEvent),
    /// Hand a relayed operation to the engine.
    Draw(DrawEvent),
    /// Rebuild the canvas from the room's operation list.
    LoadCanvas(Vec<Operation>),
    /// A peer left the room; pass to [`crate::engine::Engine::forget_peer`].
    PeerLeft(UserId),
    /// Show a transient notice.
    Notify { level: NoticeLevel, message: String },
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("not connected to server")]
    NotConnected,
    #[error("please enter a room ID")]
    EmptyRoomId,
}

impl ErrorCode for SessionError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotConnected => "E_NOT_CONNECTED",
            Self::EmptyRoomId => "E_EMPTY_ROOM_ID",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::NotConnected)
    }
}

#[derive(Debug, Default)]
pub struct Session {
    status: ConnectionStatus,
    user_id: Option<UserId>,
    room_id: Option<RoomId>,
    user_info: Option<UserInfo>,
    users: Vec<Member>,
    cursors: Cursors,
    throttle: CursorThrottle,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ── Connection ──────────────────────────────────────────────

    pub fn on_connecting(&mut self) {
        self.status = ConnectionStatus::Connecting;
    }

    /// The channel dropped. Room membership ends with the connection on
    /// the server, so everything room-scoped is forgotten here too.
    pub fn on_disconnected(&mut self) {
        self.status = ConnectionStatus::Disconnected;
        self.user_id = None;
        self.leave_room_state();
    }

    // ── Outbound ────────────────────────────────────────────────

    /// # Errors
    ///
    /// [`SessionError::NotConnected`] before the server greeting arrives.
    pub fn create_room(&self) -> Result<ClientEvent, SessionError> {
        self.ensure_connected()?;
        Ok(ClientEvent::CreateRoom)
    }

    /// Validate and build a join request. The id is sent trimmed; the server
    /// normalizes case.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotConnected`] before the greeting,
    /// [`SessionError::EmptyRoomId`] for a blank id.
    pub fn join_room(&self, raw_room_id: &str) -> Result<ClientEvent, SessionError> {
        self.ensure_connected()?;
        let room_id = raw_room_id.trim();
        if room_id.is_empty() {
            return Err(SessionError::EmptyRoomId);
        }
        Ok(ClientEvent::JoinRoom { room_id: room_id.to_owned() })
    }

    /// Local pointer moved over the canvas (normalized). Throttled; `None`
    /// when dropped or when not in a room.
    pub fn cursor_moved(&mut self, x: f64, y: f64, now_ms: f64) -> Option<ClientEvent> {
        if self.room_id.is_none() || !self.throttle.admit(now_ms) {
            return None;
        }
        Some(ClientEvent::CursorMove { x, y })
    }

    /// Local pointer left the canvas. Never throttled so peers always hide it.
    #[must_use]
    pub fn cursor_hidden(&self) -> Option<ClientEvent> {
        self.room_id.as_ref()?;
        Some(ClientEvent::CursorMove { x: HIDDEN_CURSOR, y: HIDDEN_CURSOR })
    }

    // ── Inbound ─────────────────────────────────────────────────

    /// Apply a server event and return what the host must do next.
    pub fn handle_server_event(&mut self, event: ServerEvent) -> Vec<SessionAction> {
        match event {
            ServerEvent::Connected { user_id } => {
                self.status = ConnectionStatus::Connected;
                self.user_id = Some(user_id);
                Vec::new()
            }
            ServerEvent::RoomCreated { room_id, user_info, users } => {
                let message = format!("Room created: {room_id}. Share the room ID with others to collaborate.");
                self.enter_room(room_id, user_info, users);
                vec![notice(NoticeLevel::Info, message)]
            }
            ServerEvent::RoomJoined { room_id, user_info, users } => {
                let message = format!("Joined room: {room_id}");
                self.enter_room(room_id, user_info, users);
                vec![notice(NoticeLevel::Info, message), SessionAction::Send(ClientEvent::RequestCanvasState)]
            }
            ServerEvent::RoomError { message, .. } => {
                vec![notice(NoticeLevel::Error, format!("Error: {message}"))]
            }
            ServerEvent::UserJoined { user_id, user_info, users } => {
                self.users = users;
                if Some(user_id) == self.user_id {
                    return Vec::new();
                }
                vec![notice(NoticeLevel::Info, format!("{} joined the room", user_info.name))]
            }
            ServerEvent::UserLeft { user_id, users } => {
                self.users = users;
                self.cursors.remove(&user_id);
                vec![
                    SessionAction::PeerLeft(user_id),
                    notice(NoticeLevel::Info, "A user left the room".to_owned()),
                ]
            }
            ServerEvent::CursorMove { user_id, x, y, color } => {
                if Some(user_id) != self.user_id {
                    self.cursors.apply(user_id, x, y, &color);
                }
                Vec::new()
            }
            ServerEvent::Draw(draw) => {
                if self.is_own_echo(&draw) {
                    return Vec::new();
                }
                vec![SessionAction::Draw(draw)]
            }
            ServerEvent::CanvasState { operations } => vec![SessionAction::LoadCanvas(operations)],
        }
    }

    // ── Queries ─────────────────────────────────────────────────

    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    #[must_use]
    pub fn room_id(&self) -> Option<&str> {
        self.room_id.as_deref()
    }

    #[must_use]
    pub fn user_info(&self) -> Option<&UserInfo> {
        self.user_info.as_ref()
    }

    #[must_use]
    pub fn users(&self) -> &[Member] {
        &self.users
    }

    #[must_use]
    pub fn cursors(&self) -> &Cursors {
        &self.cursors
    }

    /// Whether a roster entry is this client.
    #[must_use]
    pub fn is_self(&self, member: &Member) -> bool {
        Some(member.id) == self.user_id
    }

    // ── Internals ───────────────────────────────────────────────

    fn ensure_connected(&self) -> Result<(), SessionError> {
        if self.status == ConnectionStatus::Connected {
            Ok(())
        } else {
            Err(SessionError::NotConnected)
        }
    }

    fn enter_room(&mut self, room_id: RoomId, user_info: UserInfo, users: Vec<Member>) {
        self.room_id = Some(room_id);
        self.user_info = Some(user_info);
        self.users = users;
        self.cursors.clear();
    }

    fn leave_room_state(&mut self) {
        self.room_id = None;
        self.user_info = None;
        self.users.clear();
        self.cursors.clear();
    }

    fn is_own_echo(&self, draw: &DrawEvent) -> bool {
        !draw.is_shared_history() && Some(draw.user_id()) == self.user_id
    }
}

fn notice(level: NoticeLevel, message: String) -> SessionAction {
    SessionAction::Notify { level, message }
}
