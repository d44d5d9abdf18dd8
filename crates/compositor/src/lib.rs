//! Patchbay Compositor
//!
//! Combines up to K independently-placed input slots into one output
//! frame per `draw()` tick. Each slot binds a source and a layout rule;
//! slots rasterize in ascending index order, so later indices draw on
//! top. The finished canvas fans out through the compositor's own router
//! and is handed to an attached preview surface, if any.
//!
//! `draw()` is the only scheduling primitive: callers drive the
//! compositing loop by calling it repeatedly; there is no internal timer.

pub mod compositor;
pub mod layout;

pub use compositor::Compositor;
pub use layout::Placement;
pub use patchbay_frame::PreviewSurface;
