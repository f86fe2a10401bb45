//! Bounded raster snapshot history with stroke-boundary markers.
//!
//! DESIGN
//! ======
//! Visual state is a snapshot: moving through history restores a stored
//! raster wholesale and never replays operations.
//!
//! A boundary marker on index `i` means "a stroke finished at snapshot `i`".
//! Undo walks back to the snapshot just before the latest boundary at or
//! below the live index, so one undo removes one whole stroke even when
//! several snapshots were taken while it was drawn.
//!
//! Invariant: every boundary index is a valid index into `entries`. Saving
//! past the live index truncates the redo tail and its markers; evicting the
//! oldest `k` snapshots shifts every marker by `-k` and drops the ones that
//! fall off the front.

use crate::consts::MAX_HISTORY;

/// "A stroke just completed at this snapshot index."
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary {
    pub index: usize,
    pub is_after_stroke: bool,
}

#[derive(Debug, Clone)]
pub struct SnapshotHistory<T> {
    entries: Vec<T>,
    /// Live index; `None` means a blank canvas before the first snapshot.
    index: Option<usize>,
    boundaries: Vec<Boundary>,
    capacity: usize,
}

impl<T> Default for SnapshotHistory<T> {
    fn default() -> Self {
        Self::with_capacity(MAX_HISTORY)
    }
}

impl<T: PartialEq> SnapshotHistory<T> {
    /// Store a snapshot at `index + 1`, discarding any redo tail.
    ///
    /// Without `force`, a snapshot identical to the live tip is skipped.
    /// Returns whether the snapshot was stored.
    pub fn save(&mut self, snapshot: T, force: bool, after_stroke: bool) -> bool {
        if !force {
            if let Some(index) = self.index {
                if index + 1 == self.entries.len() && self.entries[index] == snapshot {
                    return false;
                }
            }
        }

        let keep = self.index.map_or(0, |i| i + 1);
        self.entries.truncate(keep);
        self.boundaries.retain(|b| b.index < keep);

        self.entries.push(snapshot);
        let index = self.entries.len() - 1;
        self.index = Some(index);
        if after_stroke {
            self.boundaries.push(Boundary { index, is_after_stroke: true });
        }

        if self.entries.len() > self.capacity {
            let removed = self.entries.len() - self.capacity;
            self.entries.drain(..removed);
            self.index = Some(index - removed);
            self.boundaries.retain(|b| b.index >= removed);
            for boundary in &mut self.boundaries {
                boundary.index -= removed;
            }
        }
        true
    }
}

impl<T> SnapshotHistory<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self { entries: Vec::new(), index: None, boundaries: Vec::new(), capacity: capacity.max(1) }
    }

    /// Step back one stroke. Returns whether the live index moved.
    pub fn undo(&mut self) -> bool {
        let Some(index) = self.index else {
            return false;
        };

        let target = match self.boundaries.iter().rev().find(|b| b.is_after_stroke && b.index <= index) {
            // One snapshot before the boundary; `None` below index 0 is the blank canvas.
            Some(boundary) => boundary.index.checked_sub(1),
            None => index.checked_sub(1),
        };

        self.boundaries.retain(|b| target.is_some_and(|t| b.index <= t));
        self.index = target;
        true
    }

    /// Step forward one snapshot. Returns whether the live index moved.
    pub fn redo(&mut self) -> bool {
        let next = self.index.map_or(0, |i| i + 1);
        if next < self.entries.len() {
            self.index = Some(next);
            true
        } else {
            false
        }
    }

    /// Drop everything, back to a blank canvas.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.boundaries.clear();
        self.index = None;
    }

    // --- Queries ---

    /// Snapshot at the live index, or `None` for a blank canvas.
    #[must_use]
    pub fn current(&self) -> Option<&T> {
        self.index.and_then(|i| self.entries.get(i))
    }

    #[must_use]
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn boundaries(&self) -> &[Boundary] {
        &self.boundaries
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
#[path = "history_test.rs"]
mod history_test;
