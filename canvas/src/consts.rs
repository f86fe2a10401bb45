//! Shared numeric constants for the canvas crate.

// ── History ─────────────────────────────────────────────────────

/// Maximum number of raster snapshots kept for local undo/redo.
pub const MAX_HISTORY: usize = 50;

/// Delay before a remote `stroke_end` snapshot is taken, so the final
/// segment's pixels have landed.
pub const REMOTE_STROKE_SETTLE_MS: u32 = 10;

// ── Presence ────────────────────────────────────────────────────

/// Minimum interval between outbound cursor updates.
pub const CURSOR_THROTTLE_MS: f64 = 50.0;

// ── Pen ─────────────────────────────────────────────────────────

/// The eraser clears a band twice as wide as the selected size.
pub const ERASER_WIDTH_FACTOR: f64 = 2.0;

pub const DEFAULT_COLOR: &str = "#000000";

pub const DEFAULT_SIZE: f64 = 5.0;
