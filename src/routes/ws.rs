//! WebSocket handler: bidirectional event relay.
//!
//! DESIGN
//! ======
//! On upgrade, generates a user ID and enters a `select!` loop:
//! - Incoming client text messages → decode + hand to the relay
//! - Events queued for this client (replies and room broadcasts) → forward
//!
//! Every outbound event, including replies to this client's own requests,
//! goes through the per-connection queue. The relay enqueues while holding
//! the room state lock, so the socket sees one room's events in order.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → register queue → `connected` with `userId`
//! 2. Client sends events → relay mutates and enqueues fan-out
//! 3. Queue drains to the socket
//! 4. Close → relay leaves the room (`user_left` to peers) → cleanup

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use frames::{ClientEvent, ServerEvent, UserId};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::services::relay;
use crate::state::AppState;

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState) {
    let user_id = Uuid::new_v4();

    // Per-connection queue for replies and room broadcasts.
    let (client_tx, mut client_rx) = mpsc::channel::<ServerEvent>(state.config.client_queue_capacity);
    relay::connect(&state, user_id, client_tx).await;

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(msg) = msg else { break };
                let Ok(msg) = msg else { break };
                match msg {
                    Message::Text(text) => process_inbound_text(&state, user_id, &text).await,
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(event) = client_rx.recv() => {
                if send_event(&mut socket, user_id, &event).await.is_err() {
                    break;
                }
            }
        }
    }

    relay::disconnect(&state, user_id).await;
    info!(%user_id, "ws: client disconnected");
}

// =============================================================================
// INBOUND
// =============================================================================

/// Decode one inbound text message and hand it to the relay.
///
/// Malformed or unknown events are logged and ignored; the connection stays
/// open and nothing is recorded.
async fn process_inbound_text(state: &AppState, user_id: UserId, text: &str) {
    let event: ClientEvent = match frames::decode(text) {
        Ok(event) => event,
        Err(e) => {
            warn!(%user_id, error = %e, "ws: ignoring malformed inbound event");
            return;
        }
    };

    if matches!(event, ClientEvent::CursorMove { .. }) {
        debug!(%user_id, "ws: recv cursor_move");
    } else {
        info!(%user_id, event = event.name(), "ws: recv event");
    }

    relay::process_event(state, user_id, event).await;
}

// =============================================================================
// OUTBOUND
// =============================================================================

async fn send_event(socket: &mut WebSocket, user_id: UserId, event: &ServerEvent) -> Result<(), ()> {
    let json = match frames::encode(event) {
        Ok(json) => json,
        Err(e) => {
            // Skip this event; the connection itself is fine.
            warn!(%user_id, event = event.name(), error = %e, "ws: failed to encode event");
            return Ok(());
        }
    };

    match event {
        ServerEvent::CursorMove { .. } | ServerEvent::Draw(_) => {}
        ServerEvent::RoomError { code, message } => {
            warn!(%user_id, code = %code, message = %message, "ws: send room_error");
        }
        other => debug!(%user_id, event = other.name(), "ws: send event"),
    }

    socket.send(Message::Text(json.into())).await.map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
