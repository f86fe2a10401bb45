//! Synchronization relay: inbound event handling and fan-out.
//!
//! DESIGN
//! ======
//! Handler functions are pure business logic: they validate, mutate the
//! registry or a room's drawing log, and return an `Outcome`. The delivery
//! layer owns all outbound concerns and decides who receives what.
//!
//! | Event | Sender | Rest of room |
//! |-------|--------|--------------|
//! | `create_room` | `room_created` | n/a |
//! | `join_room` | `room_joined` | `user_joined` |
//! | `cursor_move` | no | yes |
//! | `draw` begin / segment / end | no | yes |
//! | `draw` clear | yes | yes |
//! | `draw` undo / redo | only if something changed | only if something changed |
//! | `request_canvas_state` | `canvas_state` | no |
//! | disconnect | n/a | `user_left` unless the room was deleted |
//!
//! ERROR HANDLING
//! ==============
//! A handler error becomes a `room_error` sent to the triggering client only.
//! It never closes the connection and never touches other rooms.

use frames::{ClientEvent, DrawEvent, DrawRequest, Operation, RoomId, ServerEvent, UserId};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

use crate::services;
use crate::services::room::{Departure, RoomError, RoomRegistry, normalize_room_id};
use crate::state::{AppState, LiveState};

// =============================================================================
// OUTCOME
// =============================================================================

/// Result returned by handler functions. The delivery layer uses this to
/// decide who receives what; handlers never send events directly.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Nothing to send (no-op undo/redo, cursor before joining).
    None,
    /// Send to the sender only.
    Reply(ServerEvent),
    /// Send to every member of the room, sender included.
    Broadcast { room_id: RoomId, event: ServerEvent },
    /// Send to every member of the room except the sender.
    BroadcastExcludeSender { room_id: RoomId, event: ServerEvent },
    /// Reply to the sender with one event, broadcast another to the peers.
    ReplyAndBroadcast { reply: ServerEvent, room_id: RoomId, broadcast: ServerEvent },
    /// Several outcomes applied in order (leaving one room, then joining another).
    Sequence(Vec<Outcome>),
}

// =============================================================================
// HANDLERS
// =============================================================================

/// Apply one inbound event to the registry and return its fan-out.
///
/// `now_ms` stamps recorded operations; client timestamps are not trusted.
///
/// # Errors
///
/// Returns [`RoomError::NotFound`] or [`RoomError::EmptyRoomId`] for a bad
/// join, and [`RoomError::NotInRoom`] for draw or canvas requests before
/// joining.
pub fn handle_event(
    rooms: &mut RoomRegistry,
    user_id: UserId,
    event: ClientEvent,
    now_ms: i64,
) -> Result<Outcome, RoomError> {
    match event {
        ClientEvent::CreateRoom => handle_create(rooms, user_id),
        ClientEvent::JoinRoom { room_id } => handle_join(rooms, user_id, &room_id),
        ClientEvent::CursorMove { x, y } => Ok(handle_cursor(rooms, user_id, x, y)),
        ClientEvent::Draw(request) => handle_draw(rooms, user_id, request, now_ms),
        ClientEvent::RequestCanvasState => {
            let room_id = current_room(rooms, user_id)?;
            let room = rooms.room(&room_id).ok_or(RoomError::NotFound(room_id))?;
            Ok(Outcome::Reply(ServerEvent::CanvasState { operations: room.log().operations() }))
        }
    }
}

fn handle_create(rooms: &mut RoomRegistry, user_id: UserId) -> Result<Outcome, RoomError> {
    let room_id = rooms.create_room();
    let departure = rooms.add_user(&room_id, user_id, None);
    let user_info = rooms
        .user_info(user_id)
        .cloned()
        .ok_or(RoomError::Internal("user info missing after join"))?;
    let users = rooms.list_members(&room_id)?;

    let created = Outcome::Reply(ServerEvent::RoomCreated { room_id, user_info, users });
    Ok(after_departure(user_id, departure, created))
}

fn handle_join(rooms: &mut RoomRegistry, user_id: UserId, raw_room_id: &str) -> Result<Outcome, RoomError> {
    let room_id = normalize_room_id(raw_room_id)?;
    if !rooms.room_exists(&room_id) {
        return Err(RoomError::NotFound(room_id));
    }

    let already_member = rooms.room_of(user_id).is_some_and(|current| *current == room_id);
    let departure = rooms.add_user(&room_id, user_id, None);
    let user_info = rooms
        .user_info(user_id)
        .cloned()
        .ok_or(RoomError::Internal("user info missing after join"))?;
    let users = rooms.list_members(&room_id)?;

    let reply = ServerEvent::RoomJoined { room_id: room_id.clone(), user_info: user_info.clone(), users: users.clone() };
    if already_member {
        return Ok(Outcome::Reply(reply));
    }

    let joined = Outcome::ReplyAndBroadcast {
        reply,
        room_id,
        broadcast: ServerEvent::UserJoined { user_id, user_info, users },
    };
    Ok(after_departure(user_id, departure, joined))
}

fn handle_cursor(rooms: &mut RoomRegistry, user_id: UserId, x: f64, y: f64) -> Outcome {
    // Silently ignore cursor moves before joining.
    match services::cursor::cursor_moved(rooms, user_id, x, y) {
        Some((room_id, event)) => Outcome::BroadcastExcludeSender { room_id, event },
        None => Outcome::None,
    }
}

fn handle_draw(
    rooms: &mut RoomRegistry,
    user_id: UserId,
    request: DrawRequest,
    now_ms: i64,
) -> Result<Outcome, RoomError> {
    let room_id = current_room(rooms, user_id)?;
    let room = rooms
        .room_mut(&room_id)
        .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;
    let log = room.log_mut();

    let op = match request {
        DrawRequest::Undo => {
            let Some(undone_stroke) = log.undo() else {
                debug!(%room_id, %user_id, "draw: nothing to undo");
                return Ok(Outcome::None);
            };
            return Ok(Outcome::Broadcast { room_id, event: ServerEvent::Draw(DrawEvent::Undo { user_id, undone_stroke }) });
        }
        DrawRequest::Redo => {
            let Some(redone_stroke) = log.redo() else {
                debug!(%room_id, %user_id, "draw: nothing to redo");
                return Ok(Outcome::None);
            };
            return Ok(Outcome::Broadcast { room_id, event: ServerEvent::Draw(DrawEvent::Redo { user_id, redone_stroke }) });
        }
        other => match other.into_operation() {
            Some(op) => op.stamped(user_id, now_ms),
            None => return Ok(Outcome::None),
        },
    };

    let is_clear = matches!(op, Operation::Clear(_));
    log.record(op.clone());
    let event = ServerEvent::Draw(DrawEvent::from(op));

    if is_clear {
        info!(%room_id, %user_id, "draw: canvas cleared");
        Ok(Outcome::Broadcast { room_id, event })
    } else {
        Ok(Outcome::BroadcastExcludeSender { room_id, event })
    }
}

fn current_room(rooms: &RoomRegistry, user_id: UserId) -> Result<RoomId, RoomError> {
    rooms.room_of(user_id).cloned().ok_or(RoomError::NotInRoom)
}

/// Tell the old room about a departure before the new outcome applies.
/// Deleted rooms get no event.
fn after_departure(user_id: UserId, departure: Option<Departure>, then: Outcome) -> Outcome {
    match departure.map(|d| departure_outcome(user_id, d)) {
        Some(Outcome::None) | None => then,
        Some(left) => Outcome::Sequence(vec![left, then]),
    }
}

fn departure_outcome(user_id: UserId, departure: Departure) -> Outcome {
    if departure.room_deleted {
        return Outcome::None;
    }
    Outcome::Broadcast {
        room_id: departure.room_id,
        event: ServerEvent::UserLeft { user_id, users: departure.remaining },
    }
}

// =============================================================================
// DELIVERY
// =============================================================================

/// Enqueue an outcome's events. Call with the live-state lock still held so
/// fan-out order matches mutation order.
pub fn deliver(live: &LiveState, user_id: UserId, outcome: Outcome) {
    match outcome {
        Outcome::None => {}
        Outcome::Reply(event) => send_to(live, user_id, event),
        Outcome::Broadcast { room_id, event } => broadcast(live, &room_id, &event, None),
        Outcome::BroadcastExcludeSender { room_id, event } => broadcast(live, &room_id, &event, Some(user_id)),
        Outcome::ReplyAndBroadcast { reply, room_id, broadcast: peers } => {
            send_to(live, user_id, reply);
            broadcast(live, &room_id, &peers, Some(user_id));
        }
        Outcome::Sequence(outcomes) => {
            for outcome in outcomes {
                deliver(live, user_id, outcome);
            }
        }
    }
}

/// Fan an event out to the members of one room.
pub fn broadcast(live: &LiveState, room_id: &str, event: &ServerEvent, exclude: Option<UserId>) {
    let Some(room) = live.rooms.room(room_id) else {
        return;
    };

    for member in room.members() {
        if exclude == Some(*member) {
            continue;
        }
        if let Some(tx) = live.clients.get(member) {
            enqueue(tx, *member, event.clone());
        }
    }
}

pub fn send_to(live: &LiveState, user_id: UserId, event: ServerEvent) {
    if let Some(tx) = live.clients.get(&user_id) {
        enqueue(tx, user_id, event);
    }
}

/// Best-effort: if a client's queue is full the event is dropped for that client.
fn enqueue(tx: &mpsc::Sender<ServerEvent>, user_id: UserId, event: ServerEvent) {
    match tx.try_send(event) {
        Ok(()) => {}
        Err(TrySendError::Full(event)) => {
            warn!(%user_id, event = event.name(), "relay: client queue full; event dropped");
        }
        Err(TrySendError::Closed(_)) => {
            debug!(%user_id, "relay: client queue closed");
        }
    }
}

// =============================================================================
// ENTRY POINTS
// =============================================================================

/// Register a client's outbound queue and greet it.
pub async fn connect(state: &AppState, user_id: UserId, tx: mpsc::Sender<ServerEvent>) {
    let mut live = state.live.write().await;
    live.clients.insert(user_id, tx);
    send_to(&live, user_id, ServerEvent::Connected { user_id });
    info!(%user_id, clients = live.clients.len(), "relay: client connected");
}

/// Handle one inbound event: mutate, then enqueue fan-out under the same lock.
pub async fn process_event(state: &AppState, user_id: UserId, event: ClientEvent) {
    let name = event.name();
    let mut live = state.live.write().await;

    let outcome = match handle_event(&mut live.rooms, user_id, event, frames::now_ms()) {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(%user_id, event = name, error = %e, "relay: event rejected");
            Outcome::Reply(ServerEvent::room_error(&e))
        }
    };
    deliver(&live, user_id, outcome);
}

/// Drop a client's queue and leave its room. Peers get `user_left` unless
/// the room was deleted.
pub async fn disconnect(state: &AppState, user_id: UserId) {
    let mut live = state.live.write().await;
    live.clients.remove(&user_id);

    if let Some(departure) = live.rooms.leave(user_id) {
        let outcome = departure_outcome(user_id, departure);
        deliver(&live, user_id, outcome);
    }
    info!(%user_id, clients = live.clients.len(), rooms = live.rooms.room_count(), "relay: client disconnected");
}

#[cfg(test)]
#[path = "relay_test.rs"]
mod tests;
