//! Room registry: membership, display identity, and room lifecycle.
//!
//! DESIGN
//! ======
//! The registry owns every live room and, through it, that room's drawing
//! log. Nothing else holds a reference to a log: rooms are created on first
//! use and dropped, log included, when the last member leaves.
//!
//! A user belongs to at most one room. Joining a room first removes the user
//! from any other room. User info (name, color, cursor) lives as long as the
//! membership; a user who leaves and rejoins gets a fresh color.

use std::collections::{HashMap, HashSet};

use frames::{Cursor, ErrorCode, Member, RoomId, UserId, UserInfo};
use rand::Rng;
use tracing::info;

use crate::services::drawing::{DrawingLog, LogLimits};

/// Unambiguous alphabet for room codes (no `I`, `O`, `0`, `1`).
const ROOM_ID_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// 6 characters over 32 symbols = 30 bits.
pub const ROOM_ID_LEN: usize = 6;

pub const PALETTE: [&str; 15] = [
    "#FF0000", "#00FF00", "#0000FF", "#FFFF00", "#FF00FF", "#00FFFF", "#FFA500", "#800080", "#FFC0CB", "#A52A2A",
    "#808080", "#000000", "#008000", "#000080", "#800000",
];

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("room does not exist: {0}")]
    NotFound(RoomId),
    #[error("room id required")]
    EmptyRoomId,
    #[error("join a room first")]
    NotInRoom,
    #[error("internal error: {0}")]
    Internal(&'static str),
}

impl ErrorCode for RoomError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_ROOM_NOT_FOUND",
            Self::EmptyRoomId => "E_EMPTY_ROOM_ID",
            Self::NotInRoom => "E_NOT_IN_ROOM",
            Self::Internal(_) => "E_INTERNAL",
        }
    }
}

/// One live room: ordered members plus its drawing log.
#[derive(Debug)]
pub struct Room {
    members: Vec<UserId>,
    log: DrawingLog,
}

impl Room {
    fn new(limits: LogLimits) -> Self {
        Self { members: Vec::new(), log: DrawingLog::with_limits(limits) }
    }

    #[must_use]
    pub fn members(&self) -> &[UserId] {
        &self.members
    }

    #[must_use]
    pub fn log(&self) -> &DrawingLog {
        &self.log
    }

    pub fn log_mut(&mut self) -> &mut DrawingLog {
        &mut self.log
    }
}

/// What happened to the room a user left.
#[derive(Debug, Clone, PartialEq)]
pub struct Departure {
    pub room_id: RoomId,
    /// Roster after removal; empty when the room was deleted.
    pub remaining: Vec<Member>,
    pub room_deleted: bool,
}

// =============================================================================
// REGISTRY
// =============================================================================

#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<RoomId, Room>,
    user_rooms: HashMap<UserId, RoomId>,
    users: HashMap<UserId, UserInfo>,
    color_cursor: usize,
    limits: LogLimits,
}

impl RoomRegistry {
    #[must_use]
    pub fn new(limits: LogLimits) -> Self {
        Self { limits, ..Self::default() }
    }

    /// Create an empty room with a code unique among live rooms.
    pub fn create_room(&mut self) -> RoomId {
        let mut rng = rand::rng();
        let room_id = loop {
            let candidate = random_room_id(&mut rng);
            if !self.rooms.contains_key(&candidate) {
                break candidate;
            }
        };
        self.rooms.insert(room_id.clone(), Room::new(self.limits));
        info!(%room_id, "room created");
        room_id
    }

    /// Put `user_id` in `room_id`, creating the room if absent. Returns the
    /// departure from the user's previous room, if they were in a different one.
    pub fn add_user(&mut self, room_id: &str, user_id: UserId, name: Option<&str>) -> Option<Departure> {
        if self.user_rooms.get(&user_id).is_some_and(|current| current == room_id) {
            return None;
        }
        let departure = self.leave(user_id);

        let limits = self.limits;
        let room = self
            .rooms
            .entry(room_id.to_owned())
            .or_insert_with(|| Room::new(limits));
        room.members.push(user_id);
        self.user_rooms.insert(user_id, room_id.to_owned());

        if !self.users.contains_key(&user_id) {
            let color = self.next_color();
            let name = name.map_or_else(|| default_name(user_id), str::to_owned);
            self.users.insert(user_id, UserInfo { name, color, cursor: None });
        }

        info!(%room_id, %user_id, members = self.member_count(room_id), "user joined room");
        departure
    }

    /// Remove `user_id` from `room_id`, deleting the room when it empties.
    ///
    /// # Errors
    ///
    /// Returns [`RoomError::NotFound`] if the room does not exist.
    pub fn remove_user(&mut self, room_id: &str, user_id: UserId) -> Result<Departure, RoomError> {
        let room = self
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| RoomError::NotFound(room_id.to_owned()))?;
        room.members.retain(|id| *id != user_id);
        room.log.abandon(&user_id);
        let room_deleted = room.members.is_empty();

        if self.user_rooms.get(&user_id).is_some_and(|current| current == room_id) {
            self.user_rooms.remove(&user_id);
            self.users.remove(&user_id);
        }

        if room_deleted {
            self.rooms.remove(room_id);
            info!(%room_id, "room deleted (no users left)");
        } else {
            info!(%room_id, %user_id, remaining = self.member_count(room_id), "user left room");
        }

        let remaining = if room_deleted { Vec::new() } else { self.list_members(room_id)? };
        Ok(Departure { room_id: room_id.to_owned(), remaining, room_deleted })
    }

    /// Remove `user_id` from whatever room they are in.
    pub fn leave(&mut self, user_id: UserId) -> Option<Departure> {
        let room_id = self.user_rooms.get(&user_id)?.clone();
        self.remove_user(&room_id, user_id).ok()
    }

    /// Roster snapshot in join order.
    ///
    /// # Errors
    ///
    /// Returns [`RoomError::NotFound`] if the room does not exist.
    pub fn list_members(&self, room_id: &str) -> Result<Vec<Member>, RoomError> {
        let room = self
            .rooms
            .get(room_id)
            .ok_or_else(|| RoomError::NotFound(room_id.to_owned()))?;
        Ok(room
            .members
            .iter()
            .filter_map(|id| {
                let info = self.users.get(id)?;
                Some(Member { id: *id, name: info.name.clone(), color: info.color.clone(), cursor: info.cursor })
            })
            .collect())
    }

    /// Last-write-wins cursor update. `None` hides the cursor.
    pub fn update_cursor(&mut self, user_id: UserId, cursor: Option<Cursor>) -> Option<&UserInfo> {
        let info = self.users.get_mut(&user_id)?;
        info.cursor = cursor;
        Some(info)
    }

    // --- Queries ---

    #[must_use]
    pub fn user_info(&self, user_id: UserId) -> Option<&UserInfo> {
        self.users.get(&user_id)
    }

    #[must_use]
    pub fn room_of(&self, user_id: UserId) -> Option<&RoomId> {
        self.user_rooms.get(&user_id)
    }

    #[must_use]
    pub fn room_exists(&self, room_id: &str) -> bool {
        self.rooms.contains_key(room_id)
    }

    #[must_use]
    pub fn room(&self, room_id: &str) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    pub fn room_mut(&mut self, room_id: &str) -> Option<&mut Room> {
        self.rooms.get_mut(room_id)
    }

    #[must_use]
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    fn member_count(&self, room_id: &str) -> usize {
        self.rooms.get(room_id).map_or(0, |room| room.members.len())
    }

    /// Round-robin over the palette, skipping colors held by active users.
    /// Falls back to plain round-robin once every color is taken.
    fn next_color(&mut self) -> String {
        let in_use: HashSet<&str> = self.users.values().map(|u| u.color.as_str()).collect();
        let start = self.color_cursor;
        let free = (0..PALETTE.len())
            .map(|offset| (start + offset) % PALETTE.len())
            .find(|idx| !in_use.contains(PALETTE[*idx]));
        let idx = free.unwrap_or(start % PALETTE.len());
        self.color_cursor = idx + 1;
        PALETTE[idx].to_owned()
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Trim and upper-case a typed room code.
///
/// # Errors
///
/// Returns [`RoomError::EmptyRoomId`] for blank input.
pub fn normalize_room_id(raw: &str) -> Result<RoomId, RoomError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(RoomError::EmptyRoomId);
    }
    Ok(trimmed.to_ascii_uppercase())
}

fn random_room_id(rng: &mut impl Rng) -> RoomId {
    (0..ROOM_ID_LEN)
        .map(|_| char::from(ROOM_ID_ALPHABET[rng.random_range(0..ROOM_ID_ALPHABET.len())]))
        .collect()
}

fn default_name(user_id: UserId) -> String {
    let simple = user_id.simple().to_string();
    format!("User {}", simple.get(..6).unwrap_or(&simple))
}

#[cfg(test)]
#[path = "room_test.rs"]
mod tests;
