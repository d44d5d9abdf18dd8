//! Viewer glue: one source rendered to a preview surface.

use std::sync::Arc;

use patchbay_frame::{Frame, PreviewSurface, PullResult, Puller, SharedSource};

/// Pull-driven preview of a single source.
///
/// The caller drives `draw()` in its own loop, like the compositor's
/// tick. Each call polls the bound source, keeps the latest frame, and
/// re-presents it to the surface; the surface answering `false` is the
/// termination signal.
pub struct Viewer {
    surface: Box<dyn PreviewSurface>,
    puller: Option<Puller>,
    cached: Option<Arc<Frame>>,
    running: bool,
}

impl Viewer {
    pub fn new(surface: Box<dyn PreviewSurface>) -> Self {
        Self {
            surface,
            puller: None,
            cached: None,
            running: true,
        }
    }

    /// Bind the source to display. Replaces any previous binding and
    /// starts with fresh staleness state.
    pub fn set_source(&mut self, source: SharedSource) {
        self.puller = Some(Puller::new(source));
        self.cached = None;
    }

    /// One draw tick. Returns `false` once the surface has closed.
    pub fn draw(&mut self) -> bool {
        if !self.running {
            return false;
        }

        if let Some(puller) = self.puller.as_mut() {
            match puller.pull() {
                PullResult::Frame(frame) => self.cached = Some(frame),
                PullResult::NoNewFrame | PullResult::EndOfStream => {}
            }
        }

        if let Some(frame) = &self.cached {
            if !self.surface.present(frame) {
                tracing::info!("Viewer surface closed");
                self.running = false;
                return false;
            }
        }

        true
    }
}
