//! The raster target the engine paints on.
//!
//! The engine never touches a canvas element directly. It draws through
//! [`Surface`], which the browser build implements over a 2D context
//! ([`crate::web::CanvasSurface`]) and tests implement in memory.
//!
//! Coordinates are surface pixels (CSS pixels in the browser). Remote
//! segments arrive normalized to `[0, 1]` and are scaled by [`Surface::size`]
//! before they get here.

use frames::Tool;

/// A point in surface pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Pen settings for one segment.
#[derive(Debug, Clone, PartialEq)]
pub struct Pen {
    pub tool: Tool,
    pub color: String,
    pub size: f64,
}

pub trait Surface {
    /// Opaque full-raster encoding (a data URL in the browser).
    type Snapshot: Clone + PartialEq;
    type Error;

    /// Drawing-space width and height.
    fn size(&self) -> (f64, f64);

    /// Paint one line segment. The eraser removes pixels instead of painting.
    ///
    /// # Errors
    ///
    /// Backend-specific drawing failure.
    fn stroke_segment(&mut self, from: Point, to: Point, pen: &Pen) -> Result<(), Self::Error>;

    /// Erase everything.
    ///
    /// # Errors
    ///
    /// Backend-specific drawing failure.
    fn clear(&mut self) -> Result<(), Self::Error>;

    /// Encode the current raster.
    ///
    /// # Errors
    ///
    /// Backend-specific encoding failure.
    fn snapshot(&self) -> Result<Self::Snapshot, Self::Error>;

    /// Replace the whole raster with a snapshot. May complete asynchronously.
    ///
    /// # Errors
    ///
    /// Backend-specific decoding failure.
    fn restore(&mut self, snapshot: &Self::Snapshot) -> Result<(), Self::Error>;
}
