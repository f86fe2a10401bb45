//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! Live state sits behind one `RwLock`: the room registry (which owns every
//! room's drawing log) and the outbound queue of each connected client.
//!
//! Every mutation takes the write lock and enqueues its fan-out before
//! releasing it, so all members see one room's events in mutation order.
//! Mutations never block: enqueueing uses `try_send`.

use std::collections::HashMap;
use std::sync::Arc;

use frames::{ServerEvent, UserId};
use tokio::sync::{RwLock, mpsc};

use crate::config::Config;
use crate::services::room::RoomRegistry;

// =============================================================================
// LIVE STATE
// =============================================================================

/// Rooms plus the outbound queue of every connected client.
#[derive(Debug, Default)]
pub struct LiveState {
    pub rooms: RoomRegistry,
    /// Connected clients: `user_id` -> sender for outgoing events.
    pub clients: HashMap<UserId, mpsc::Sender<ServerEvent>>,
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub live: Arc<RwLock<LiveState>>,
    pub config: Arc<Config>,
}

impl AppState {
    #[must_use]
    pub fn new(config: Config) -> Self {
        let live = LiveState { rooms: RoomRegistry::new(config.log_limits), clients: HashMap::new() };
        Self { live: Arc::new(RwLock::new(live)), config: Arc::new(config) }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
