//! Client reconciliation engine for the collaborative drawing room.
//!
//! This crate is compiled to WebAssembly and runs in the browser. It keeps
//! the local canvas consistent with the room: local strokes are painted
//! optimistically, relayed remote operations are merged onto the same
//! raster, and undo/redo echoes from the server replay a local snapshot
//! history. The host JavaScript layer wires DOM input and the channel to
//! the [`session::Session`] and [`engine::Engine`], sends the requests they
//! return, and schedules the [`engine::DeferredSave`]s the engine hands back.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Generic engine over any [`surface::Surface`] |
//! | [`history`] | Bounded snapshot history with stroke-boundary markers |
//! | [`session`] | Connection status, membership, and inbound event dispatch |
//! | [`presence`] | Remote cursors and outbound cursor throttling |
//! | [`surface`] | The raster abstraction the engine paints on |
//! | [`web`] | `HtmlCanvasElement` implementation of [`surface::Surface`] |
//! | [`consts`] | Shared numeric constants (history depth, throttle, pen defaults) |

pub mod consts;
pub mod engine;
pub mod history;
pub mod presence;
pub mod session;
pub mod surface;
pub mod web;
