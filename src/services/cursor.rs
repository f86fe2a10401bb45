//! Cursor service: ephemeral cursor presence.
//!
//! DESIGN
//! ======
//! Only the last position per user is kept, on the registry's user info.
//! Nothing is logged into the drawing history. Moves from a user who is not
//! in a room are dropped.

use frames::{Cursor, RoomId, ServerEvent, UserId};

use crate::services::room::RoomRegistry;

/// Record a cursor move and build the peer notification.
///
/// Returns `None` when the user has no room. `(-1, -1)` (any negative
/// coordinate) hides the cursor; the event still carries the raw values so
/// peers can hide it too.
pub(crate) fn cursor_moved(rooms: &mut RoomRegistry, user_id: UserId, x: f64, y: f64) -> Option<(RoomId, ServerEvent)> {
    let room_id = rooms.room_of(user_id)?.clone();
    let info = rooms.update_cursor(user_id, Cursor::from_wire(x, y))?;
    let event = ServerEvent::CursorMove { user_id, x, y, color: info.color.clone() };
    Some((room_id, event))
}

#[cfg(test)]
#[path = "cursor_test.rs"]
mod tests;
