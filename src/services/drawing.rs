//! Drawing operation log: the canonical per-room record of what was drawn.
//!
//! DESIGN
//! ======
//! Two views of the same history are kept side by side:
//! - a bounded raw operation list, replayed by late joiners to reconstruct
//!   an approximate canvas;
//! - a bounded list of completed strokes, which is the undo stack. Undo pops
//!   whole strokes onto a redo stack; redo pops them back.
//!
//! In-progress strokes are keyed by user, so two people drawing at the same
//! time each aggregate into their own stroke. A `draw` from a user with no
//! open stroke is kept in the raw list only.
//!
//! A `clear` resets everything and leaves a single clear marker behind. The
//! marker is not part of the undo stack, so an undo right after a clear has
//! nothing to undo.

use std::collections::{HashMap, VecDeque};

use frames::{Operation, Stroke, UserId};
use tracing::debug;

/// Raw operation list bound.
pub const DEFAULT_MAX_OPERATIONS: usize = 1000;

/// Completed-stroke list bound (and therefore undo depth).
pub const DEFAULT_MAX_STROKES: usize = 100;

// =============================================================================
// LIMITS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogLimits {
    pub max_operations: usize,
    pub max_strokes: usize,
}

impl Default for LogLimits {
    fn default() -> Self {
        Self { max_operations: DEFAULT_MAX_OPERATIONS, max_strokes: DEFAULT_MAX_STROKES }
    }
}

// =============================================================================
// DRAWING LOG
// =============================================================================

#[derive(Debug)]
pub struct DrawingLog {
    operations: VecDeque<Operation>,
    strokes: VecDeque<Stroke>,
    redo: Vec<Stroke>,
    open: HashMap<UserId, Stroke>,
    clear_marker: Option<Stroke>,
    limits: LogLimits,
}

impl DrawingLog {
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(LogLimits::default())
    }

    #[must_use]
    pub fn with_limits(limits: LogLimits) -> Self {
        Self {
            operations: VecDeque::new(),
            strokes: VecDeque::new(),
            redo: Vec::new(),
            open: HashMap::new(),
            clear_marker: None,
            limits,
        }
    }

    /// Record a stamped operation: aggregate it into strokes, clear the redo
    /// stack, and append it to the raw list.
    pub fn record(&mut self, op: Operation) {
        match &op {
            Operation::StrokeBegin(begin) => {
                if self.open.insert(begin.user_id, Stroke::open(begin)).is_some() {
                    debug!(user_id = %begin.user_id, "drawing: stray stroke_begin replaced open stroke");
                }
            }
            Operation::Draw(segment) => {
                if let Some(stroke) = self.open.get_mut(&segment.user_id) {
                    stroke.operations.push(segment.clone());
                }
            }
            Operation::StrokeEnd(mark) => {
                if let Some(stroke) = self.open.remove(&mark.user_id).filter(|s| !s.is_empty()) {
                    self.push_stroke(stroke);
                }
            }
            Operation::Clear(mark) => {
                self.operations.clear();
                self.strokes.clear();
                self.open.clear();
                self.clear_marker = Some(Stroke::clear_marker(mark));
            }
        }

        self.redo.clear();
        self.append_raw(op);
    }

    /// Append to the bounded raw list without touching aggregation.
    pub fn append_raw(&mut self, op: Operation) {
        self.operations.push_back(op);
        while self.operations.len() > self.limits.max_operations {
            self.operations.pop_front();
        }
    }

    /// Pop the most recently completed stroke (any user's) onto the redo stack.
    /// `None` means there was nothing to undo.
    pub fn undo(&mut self) -> Option<Stroke> {
        let stroke = self.strokes.pop_back()?;
        self.redo.push(stroke.clone());
        Some(stroke)
    }

    /// Restore the most recently undone stroke. `None` means nothing to redo.
    pub fn redo(&mut self) -> Option<Stroke> {
        let stroke = self.redo.pop()?;
        self.push_stroke(stroke.clone());
        Some(stroke)
    }

    /// Drop `user_id`'s open stroke, if any. Called when the user leaves the
    /// room mid-stroke; the segments stay in the raw list.
    pub fn abandon(&mut self, user_id: &UserId) -> Option<Stroke> {
        let stroke = self.open.remove(user_id)?;
        debug!(%user_id, segments = stroke.operations.len(), "drawing: abandoned open stroke");
        Some(stroke)
    }

    fn push_stroke(&mut self, stroke: Stroke) {
        self.strokes.push_back(stroke);
        while self.strokes.len() > self.limits.max_strokes {
            self.strokes.pop_front();
        }
    }

    // --- Queries ---

    /// Snapshot of the raw operation list, oldest first.
    #[must_use]
    pub fn operations(&self) -> Vec<Operation> {
        self.operations.iter().cloned().collect()
    }

    #[cfg(test)]
    #[must_use]
    pub fn operation_count(&self) -> usize {
        self.operations.len()
    }

    /// Completed strokes, oldest first.
    #[cfg(test)]
    #[must_use]
    pub fn strokes(&self) -> &VecDeque<Stroke> {
        &self.strokes
    }

    /// Undone strokes; the last entry is the next to redo.
    #[cfg(test)]
    #[must_use]
    pub fn redo_stack(&self) -> &[Stroke] {
        &self.redo
    }

    #[cfg(test)]
    #[must_use]
    pub fn clear_marker(&self) -> Option<&Stroke> {
        self.clear_marker.as_ref()
    }

    #[cfg(test)]
    #[must_use]
    pub fn open_stroke(&self, user_id: &UserId) -> Option<&Stroke> {
        self.open.get(user_id)
    }
}

impl Default for DrawingLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "drawing_test.rs"]
mod tests;
