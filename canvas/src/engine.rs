//! Client reconciliation engine.
//!
//! DESIGN
//! ======
//! The engine merges two streams onto one surface: the local user's strokes,
//! drawn optimistically before the server sees them, and remote operations
//! relayed by the server. It keeps a bounded snapshot history with stroke
//! boundary markers so undo/redo can be replayed visually without asking
//! the server where to roll back to. The server still decides *whether*
//! an undo happens; the engine only reacts to the echoed `undo`/`redo`.
//!
//! ORDERING
//! ========
//! Remote pixels always land immediately. Remote history bookkeeping does
//! not: while a local stroke is open, a remote `stroke_begin` snapshot and
//! any remote `stroke_end` boundary are held back until the local
//! `stroke_end`, so a local undo unit is never split.
//!
//! A remote `stroke_end` boundary is saved shortly after the event, through
//! a [`DeferredSave`] the host schedules and later hands back to
//! [`Engine::fire_deferred_save`]. Starting a local stroke flushes every
//! outstanding deferred save first and invalidates its token, so a stale
//! timer can never drop a boundary into the middle of the new stroke.

use std::collections::HashSet;

use frames::{DrawEvent, DrawRequest, Mark, Operation, Segment, StrokeBegin, UserId};

use crate::consts::{DEFAULT_COLOR, DEFAULT_SIZE, REMOTE_STROKE_SETTLE_MS};
use crate::history::SnapshotHistory;
use crate::surface::{Pen, Point, Surface};

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

/// Identifies one scheduled remote-boundary save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SaveToken(u64);

/// A save the host must run after `delay_ms` by calling
/// [`Engine::fire_deferred_save`] with `token`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeferredSave {
    pub token: SaveToken,
    pub delay_ms: u32,
}

/// The local user's open stroke.
#[derive(Debug, Clone, Copy)]
struct LocalStroke {
    last: Point,
    segments: usize,
}

pub struct Engine<S: Surface> {
    surface: S,
    history: SnapshotHistory<S::Snapshot>,
    pen: Pen,
    local: Option<LocalStroke>,
    /// Remote users currently mid-stroke.
    remote_drawing: HashSet<UserId>,
    /// A remote stroke began during the local stroke; snapshot after it ends.
    pending_remote_begin: bool,
    /// A remote stroke ended during the local stroke; boundary after it ends.
    pending_remote_end: bool,
    scheduled: HashSet<SaveToken>,
    next_token: u64,
}

impl<S: Surface> Engine<S> {
    #[must_use]
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            history: SnapshotHistory::new(),
            pen: Pen { tool: frames::Tool::Pencil, color: DEFAULT_COLOR.to_owned(), size: DEFAULT_SIZE },
            local: None,
            remote_drawing: HashSet::new(),
            pending_remote_begin: false,
            pending_remote_end: false,
            scheduled: HashSet::new(),
            next_token: 0,
        }
    }

    // --- Pen ---

    pub fn set_tool(&mut self, tool: frames::Tool) {
        self.pen.tool = tool;
    }

    pub fn set_color(&mut self, color: impl Into<String>) {
        self.pen.color = color.into();
    }

    pub fn set_size(&mut self, size: f64) {
        self.pen.size = size;
    }

    // --- Local input ---

    /// Begin a local stroke at `point` (surface pixels).
    ///
    /// Flushes outstanding remote-boundary saves, then force-saves the
    /// pre-stroke snapshot so undo can always return to it.
    ///
    /// # Errors
    ///
    /// Propagates surface snapshot failures.
    pub fn pointer_down(&mut self, point: Point) -> Result<DrawRequest, S::Error> {
        self.flush_scheduled_saves()?;
        self.save(true, false)?;
        self.local = Some(LocalStroke { last: point, segments: 0 });

        let (from_x, from_y) = normalize(point, self.surface.size());
        Ok(DrawRequest::StrokeBegin(StrokeBegin {
            user_id: UserId::nil(),
            tool: self.pen.tool,
            color: self.pen.color.clone(),
            size: self.pen.size,
            from_x,
            from_y,
            timestamp: 0,
        }))
    }

    /// Extend the local stroke to `point`. Returns `None` when no stroke is open.
    ///
    /// # Errors
    ///
    /// Propagates surface drawing failures.
    pub fn pointer_move(&mut self, point: Point) -> Result<Option<DrawRequest>, S::Error> {
        let Some(local) = self.local.as_mut() else {
            return Ok(None);
        };

        let from = local.last;
        self.surface.stroke_segment(from, point, &self.pen)?;
        local.last = point;
        local.segments += 1;

        let size = self.surface.size();
        let (from_x, from_y) = normalize(from, size);
        let (to_x, to_y) = normalize(point, size);
        Ok(Some(DrawRequest::Draw(Segment {
            user_id: UserId::nil(),
            tool: self.pen.tool,
            color: self.pen.color.clone(),
            size: self.pen.size,
            from_x,
            from_y,
            to_x,
            to_y,
            timestamp: 0,
        })))
    }

    /// Close the local stroke. Returns `None` when no stroke is open.
    ///
    /// A stroke with segments gets a boundary snapshot; an empty one gets
    /// nothing. Remote bookkeeping held back during the stroke lands after.
    ///
    /// # Errors
    ///
    /// Propagates surface snapshot failures.
    pub fn pointer_up(&mut self) -> Result<Option<DrawRequest>, S::Error> {
        let Some(local) = self.local.take() else {
            return Ok(None);
        };

        if local.segments > 0 {
            self.save(true, true)?;
        }
        if std::mem::take(&mut self.pending_remote_begin) {
            self.save(true, false)?;
        }
        if std::mem::take(&mut self.pending_remote_end) {
            self.save(true, true)?;
        }
        Ok(Some(DrawRequest::StrokeEnd(Mark::default())))
    }

    // --- Requests without local effect ---

    /// Clear, undo, and redo render only when the server echoes them back.
    #[must_use]
    pub fn request_clear(&self) -> DrawRequest {
        DrawRequest::Clear(Mark::default())
    }

    #[must_use]
    pub fn request_undo(&self) -> DrawRequest {
        DrawRequest::Undo
    }

    #[must_use]
    pub fn request_redo(&self) -> DrawRequest {
        DrawRequest::Redo
    }

    // --- Remote input ---

    /// Apply a relayed draw event. Returns a save for the host to schedule
    /// when a remote stroke ends.
    ///
    /// # Errors
    ///
    /// Propagates surface failures.
    pub fn handle_incoming(&mut self, event: &DrawEvent) -> Result<Option<DeferredSave>, S::Error> {
        match event {
            DrawEvent::Clear(_) => {
                self.surface.clear()?;
                self.remote_drawing.clear();
                self.save(false, false)?;
            }
            DrawEvent::Undo { .. } => {
                if self.history.undo() {
                    self.render_current()?;
                }
            }
            DrawEvent::Redo { .. } => {
                if self.history.redo() {
                    self.render_current()?;
                }
            }
            DrawEvent::Draw(segment) => self.paint_remote(segment)?,
            DrawEvent::StrokeBegin(begin) => {
                if self.remote_drawing.insert(begin.user_id) {
                    if self.local.is_some() {
                        self.pending_remote_begin = true;
                    } else {
                        self.save(true, false)?;
                    }
                }
            }
            DrawEvent::StrokeEnd(mark) => {
                self.remote_drawing.remove(&mark.user_id);
                return Ok(Some(self.schedule_boundary()));
            }
        }
        Ok(None)
    }

    /// Forget a peer that left the room. A peer that left mid-stroke never
    /// sends its `stroke_end`, so its partial stroke gets the same deferred
    /// boundary one would have.
    pub fn forget_peer(&mut self, user_id: &UserId) -> Option<DeferredSave> {
        self.remote_drawing.remove(user_id).then(|| self.schedule_boundary())
    }

    /// Run a scheduled remote-boundary save. Stale tokens are ignored; while
    /// a local stroke is open the boundary waits for its end.
    ///
    /// # Errors
    ///
    /// Propagates surface snapshot failures.
    pub fn fire_deferred_save(&mut self, token: SaveToken) -> Result<(), S::Error> {
        if !self.scheduled.remove(&token) {
            return Ok(());
        }
        if self.local.is_some() {
            self.pending_remote_end = true;
            return Ok(());
        }
        self.save(true, true)?;
        Ok(())
    }

    /// Rebuild the canvas from the server's raw operation list and make it
    /// the history baseline.
    ///
    /// # Errors
    ///
    /// Propagates surface failures.
    pub fn load_operations(&mut self, operations: &[Operation]) -> Result<(), S::Error> {
        self.surface.clear()?;
        for op in operations {
            match op {
                Operation::Draw(segment) => self.paint_remote(segment)?,
                Operation::Clear(_) => self.surface.clear()?,
                Operation::StrokeBegin(_) | Operation::StrokeEnd(_) => {}
            }
        }

        self.history.reset();
        self.remote_drawing.clear();
        self.scheduled.clear();
        self.pending_remote_begin = false;
        self.pending_remote_end = false;
        self.save(true, false)?;
        Ok(())
    }

    // --- Queries ---

    #[must_use]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    #[must_use]
    pub fn history(&self) -> &SnapshotHistory<S::Snapshot> {
        &self.history
    }

    #[must_use]
    pub fn pen(&self) -> &Pen {
        &self.pen
    }

    #[must_use]
    pub fn is_drawing(&self) -> bool {
        self.local.is_some()
    }

    #[must_use]
    pub fn is_remote_drawing(&self, user_id: &UserId) -> bool {
        self.remote_drawing.contains(user_id)
    }

    #[must_use]
    pub fn scheduled_saves(&self) -> usize {
        self.scheduled.len()
    }

    // --- Internals ---

    fn schedule_boundary(&mut self) -> DeferredSave {
        self.next_token += 1;
        let token = SaveToken(self.next_token);
        self.scheduled.insert(token);
        DeferredSave { token, delay_ms: REMOTE_STROKE_SETTLE_MS }
    }

    fn save(&mut self, force: bool, after_stroke: bool) -> Result<bool, S::Error> {
        let snapshot = self.surface.snapshot()?;
        Ok(self.history.save(snapshot, force, after_stroke))
    }

    /// Save once for every outstanding remote boundary and drop their tokens.
    fn flush_scheduled_saves(&mut self) -> Result<(), S::Error> {
        if self.scheduled.is_empty() {
            return Ok(());
        }
        self.scheduled.clear();
        self.save(true, true)?;
        Ok(())
    }

    /// Show the live history index: its snapshot, or blank before the first.
    fn render_current(&mut self) -> Result<(), S::Error> {
        match self.history.current() {
            Some(snapshot) => self.surface.restore(snapshot),
            None => self.surface.clear(),
        }
    }

    /// Scale a normalized segment to this surface and paint it.
    fn paint_remote(&mut self, segment: &Segment) -> Result<(), S::Error> {
        let (width, height) = self.surface.size();
        let from = Point::new(segment.from_x * width, segment.from_y * height);
        let to = Point::new(segment.to_x * width, segment.to_y * height);
        let pen = Pen { tool: segment.tool, color: segment.color.clone(), size: segment.size };
        self.surface.stroke_segment(from, to, &pen)
    }
}

/// Surface pixels to `[0, 1]`. A zero-sized surface maps to the origin.
fn normalize(point: Point, (width, height): (f64, f64)) -> (f64, f64) {
    let ratio = |v: f64, extent: f64| if extent > 0.0 { v / extent } else { 0.0 };
    (ratio(point.x, width), ratio(point.y, height))
}
