//! Remote cursor tracking and outbound cursor throttling.

use std::collections::HashMap;

use frames::UserId;

use crate::consts::CURSOR_THROTTLE_MS;

/// A peer's last known cursor, normalized to `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCursor {
    pub x: f64,
    pub y: f64,
    pub color: String,
}

/// Peer cursors keyed by user. Hidden cursors are removed, not stored.
#[derive(Debug, Clone, Default)]
pub struct Cursors {
    cursors: HashMap<UserId, RemoteCursor>,
}

impl Cursors {
    /// Apply a `cursor_move`; a negative coordinate hides the cursor.
    pub fn apply(&mut self, user_id: UserId, x: f64, y: f64, color: &str) {
        if x < 0.0 || y < 0.0 {
            self.cursors.remove(&user_id);
        } else {
            self.cursors.insert(user_id, RemoteCursor { x, y, color: color.to_owned() });
        }
    }

    pub fn remove(&mut self, user_id: &UserId) {
        self.cursors.remove(user_id);
    }

    pub fn clear(&mut self) {
        self.cursors.clear();
    }

    #[must_use]
    pub fn get(&self, user_id: &UserId) -> Option<&RemoteCursor> {
        self.cursors.get(user_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&UserId, &RemoteCursor)> {
        self.cursors.iter()
    }
}

/// Lets at most one cursor update through per interval. Time comes from
/// the host (`performance.now()` in the browser).
#[derive(Debug, Clone, Copy)]
pub struct CursorThrottle {
    interval_ms: f64,
    last_sent_ms: Option<f64>,
}

impl Default for CursorThrottle {
    fn default() -> Self {
        Self::new(CURSOR_THROTTLE_MS)
    }
}

impl CursorThrottle {
    #[must_use]
    pub fn new(interval_ms: f64) -> Self {
        Self { interval_ms, last_sent_ms: None }
    }

    /// Whether an update at `now_ms` may be sent. Records it if so.
    pub fn admit(&mut self, now_ms: f64) -> bool {
        if self.last_sent_ms.is_some_and(|last| now_ms - last < self.interval_ms) {
            return false;
        }
        self.last_sent_ms = Some(now_ms);
        true
    }
}

#[cfg(test)]
#[path = "presence_test.rs"]
mod presence_test;
