//! Browser surface: [`Surface`] over an `HtmlCanvasElement` 2D context.
//!
//! This module is the only place that touches [`web_sys::CanvasRenderingContext2d`].
//! All fallible `Canvas2D` calls propagate errors via `Result<(), JsValue>`.
//!
//! DESIGN
//! ======
//! Snapshots are PNG data URLs. Restoring one decodes an image, which the
//! browser does asynchronously, so [`CanvasSurface::restore`] returns before
//! the pixels land. Each restore or clear bumps a generation counter and a
//! decode callback only blits if its generation is still the latest, so a
//! slow decode can never overwrite a newer state.

use std::cell::Cell;
use std::rc::Rc;

use frames::Tool;
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen::closure::Closure;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement};

use crate::consts::ERASER_WIDTH_FACTOR;
use crate::engine::Engine;
use crate::surface::{Pen, Point, Surface};

/// The engine as the browser build runs it.
pub type BrowserEngine = Engine<CanvasSurface>;

pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    width_css: f64,
    height_css: f64,
    restore_generation: Rc<Cell<u64>>,
}

impl CanvasSurface {
    /// Bind to a canvas element, sized to its current attributes at `dpr` 1.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the element has no 2D context.
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self, JsValue> {
        let ctx = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("canvas has no 2d context"))?
            .dyn_into::<CanvasRenderingContext2d>()?;
        let width_css = f64::from(canvas.width());
        let height_css = f64::from(canvas.height());

        let mut surface = Self { canvas, ctx, width_css, height_css, restore_generation: Rc::new(Cell::new(0)) };
        surface.resize(width_css, height_css, 1.0)?;
        Ok(surface)
    }

    /// Size the backing store for `width_css` x `height_css` CSS pixels at
    /// device pixel ratio `dpr`. Drawing stays in CSS pixels.
    ///
    /// Resizing wipes the bitmap; the host restores from history afterwards.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the transform cannot be set.
    pub fn resize(&mut self, width_css: f64, height_css: f64, dpr: f64) -> Result<(), JsValue> {
        self.width_css = width_css;
        self.height_css = height_css;
        self.canvas.set_width(device_px(width_css * dpr));
        self.canvas.set_height(device_px(height_css * dpr));

        self.ctx.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0)?;
        self.ctx.set_line_cap("round");
        self.ctx.set_line_join("round");
        Ok(())
    }

    #[must_use]
    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    fn bump_generation(&self) -> u64 {
        let generation = self.restore_generation.get().wrapping_add(1);
        self.restore_generation.set(generation);
        generation
    }
}

impl Surface for CanvasSurface {
    type Snapshot = String;
    type Error = JsValue;

    fn size(&self) -> (f64, f64) {
        (self.width_css, self.height_css)
    }

    fn stroke_segment(&mut self, from: Point, to: Point, pen: &Pen) -> Result<(), JsValue> {
        self.ctx.save();
        let result = self.paint_line(from, to, pen);
        self.ctx.restore();
        result
    }

    fn clear(&mut self) -> Result<(), JsValue> {
        self.bump_generation();
        self.ctx.clear_rect(0.0, 0.0, self.width_css, self.height_css);
        Ok(())
    }

    fn snapshot(&self) -> Result<String, JsValue> {
        self.canvas.to_data_url()
    }

    fn restore(&mut self, snapshot: &String) -> Result<(), JsValue> {
        let image = HtmlImageElement::new()?;
        let generation = self.bump_generation();
        let latest = Rc::clone(&self.restore_generation);
        let ctx = self.ctx.clone();
        let loaded = image.clone();
        let (width, height) = (self.width_css, self.height_css);

        let onload = Closure::once_into_js(move || {
            if latest.get() != generation {
                return;
            }
            ctx.clear_rect(0.0, 0.0, width, height);
            if let Err(err) = ctx.draw_image_with_html_image_element_and_dw_and_dh(&loaded, 0.0, 0.0, width, height) {
                web_sys::console::warn_1(&err);
            }
        });
        image.set_onload(Some(onload.unchecked_ref::<js_sys::Function>()));
        image.set_src(snapshot);
        Ok(())
    }
}

impl CanvasSurface {
    fn paint_line(&self, from: Point, to: Point, pen: &Pen) -> Result<(), JsValue> {
        match pen.tool {
            Tool::Pencil => {
                self.ctx.set_global_composite_operation("source-over")?;
                self.ctx.set_stroke_style_str(&pen.color);
                self.ctx.set_line_width(pen.size);
            }
            Tool::Eraser => {
                self.ctx.set_global_composite_operation("destination-out")?;
                self.ctx.set_line_width(pen.size * ERASER_WIDTH_FACTOR);
            }
        }
        self.ctx.begin_path();
        self.ctx.move_to(from.x, from.y);
        self.ctx.line_to(to.x, to.y);
        self.ctx.stroke();
        Ok(())
    }
}

/// The window's device pixel ratio, or 1 outside a window context.
#[must_use]
pub fn device_pixel_ratio() -> f64 {
    web_sys::window().map_or(1.0, |window| window.device_pixel_ratio())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn device_px(value: f64) -> u32 {
    value.round().max(0.0) as u32
}
