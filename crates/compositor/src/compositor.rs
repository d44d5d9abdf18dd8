//! The slot table and the draw tick.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use patchbay_common::clock::MediaClock;
use patchbay_common::error::{PatchbayError, PatchbayResult};
use patchbay_frame::{
    Frame, PreviewSurface, PullResult, Puller, Router, SharedSource, SharedTarget,
};

use crate::layout::{self, Placement, Rect};

/// Background the canvas clears to before slots rasterize.
const BACKGROUND: [u8; 3] = [204, 204, 204];

/// One bound input slot.
struct Layer {
    puller: Puller,
    placement: Placement,
    cached: Option<Arc<Frame>>,
}

impl Layer {
    fn new(source: SharedSource, placement: Placement) -> Self {
        Self {
            puller: Puller::new(source),
            placement,
            cached: None,
        }
    }
}

/// Multi-slot compositor: a target for up to K input slots and a fan-out
/// producer of its own.
///
/// The output resolution is decoupled from whatever resolution a preview
/// window uses and is mutable at runtime. Slots are sparse: binding index
/// 7 on an empty compositor grows the table with empty slots 0..7, and
/// removing a slot never renumbers the others.
pub struct Compositor {
    clock: MediaClock,
    last_stamp: u64,
    video_width: u32,
    video_height: u32,
    margin: u32,
    layers: Vec<Option<Layer>>,
    router: Router,
    preview: Option<Box<dyn PreviewSurface>>,
    stop_flag: Arc<AtomicBool>,
}

impl Compositor {
    pub fn new(video_width: u32, video_height: u32) -> PatchbayResult<Self> {
        if video_width == 0 || video_height == 0 {
            return Err(PatchbayError::compositor(format!(
                "output resolution must be positive, got {video_width}x{video_height}"
            )));
        }
        Ok(Self {
            clock: MediaClock::start(),
            last_stamp: 0,
            video_width,
            video_height,
            margin: 0,
            layers: Vec::new(),
            router: Router::new(),
            preview: None,
            stop_flag: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Bind `source` to `index` with the stretch-to-fill layout.
    pub fn set_source(&mut self, index: usize, source: SharedSource) {
        self.bind(index, source, Placement::StretchFull);
    }

    /// Bind `source` to `index` at native size, top-left at `(x, y)`.
    pub fn set_source_at(&mut self, index: usize, source: SharedSource, x: i32, y: i32) {
        self.bind(index, source, Placement::Move { x, y });
    }

    /// Bind `source` to `index`, scaled into `(x, y)..(x2, y2)`.
    pub fn set_source_rect(
        &mut self,
        index: usize,
        source: SharedSource,
        x: i32,
        y: i32,
        x2: i32,
        y2: i32,
    ) {
        self.bind(index, source, Placement::MoveStretch { x, y, x2, y2 });
    }

    fn bind(&mut self, index: usize, source: SharedSource, placement: Placement) {
        if index >= self.layers.len() {
            self.layers.resize_with(index + 1, || None);
        }
        self.layers[index] = Some(Layer::new(source, placement));
    }

    /// Clear slot `index`. The slot stays reserved; other slots keep
    /// their indices.
    pub fn remove_source(&mut self, index: usize) {
        if let Some(slot) = self.layers.get_mut(index) {
            *slot = None;
        }
    }

    /// Number of reserved slots (bound or cleared).
    pub fn slot_count(&self) -> usize {
        self.layers.len()
    }

    /// Uniform border in pixels that composited content must not cover.
    /// Takes effect on the next tick.
    pub fn set_margin(&mut self, margin: u32) {
        self.margin = margin;
    }

    pub fn set_video_resolution(&mut self, width: u32, height: u32) -> PatchbayResult<()> {
        if width == 0 || height == 0 {
            return Err(PatchbayError::compositor(format!(
                "output resolution must be positive, got {width}x{height}"
            )));
        }
        self.video_width = width;
        self.video_height = height;
        Ok(())
    }

    pub fn video_size(&self) -> (u32, u32) {
        (self.video_width, self.video_height)
    }

    /// Register a target on the compositor's own fan-out router.
    pub fn add_target(&self, target: &SharedTarget) {
        self.router.add_target(target);
    }

    pub fn set_preview(&mut self, surface: Box<dyn PreviewSurface>) {
        self.preview = Some(surface);
    }

    /// Flag checked at the top of every tick; sharable with other threads.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop_flag.clone()
    }

    pub fn request_stop(&self) {
        self.stop_flag.store(true, Ordering::SeqCst);
    }

    /// One synchronous compositing tick.
    ///
    /// Pulls every active slot, rasterizes in ascending index order onto
    /// a fresh canvas, fans the result out, and presents it to the
    /// preview. A slot whose source has nothing new this tick reuses its
    /// last rasterized frame; a slot that has never produced contributes
    /// nothing.
    ///
    /// Returns `false` once stopped or once the preview surface closes —
    /// the only termination signal for the caller's draw loop.
    pub fn draw(&mut self) -> bool {
        if self.stop_flag.load(Ordering::SeqCst) {
            return false;
        }

        let width = self.video_width;
        let height = self.video_height;
        let mut canvas = Vec::with_capacity(width as usize * height as usize * 3);
        for _ in 0..(width as usize * height as usize) {
            canvas.extend_from_slice(&BACKGROUND);
        }

        let margin = self.margin as i32;
        let clip = Rect {
            x0: margin,
            y0: margin,
            x1: width as i32 - margin,
            y1: height as i32 - margin,
        };

        if !clip.is_empty() {
            for layer in self.layers.iter_mut().flatten() {
                match layer.puller.pull() {
                    PullResult::Frame(frame) => layer.cached = Some(frame),
                    PullResult::NoNewFrame | PullResult::EndOfStream => {}
                }
                if let Some(frame) = &layer.cached {
                    layout::composite(&mut canvas, width, height, frame, layer.placement, clip);
                }
            }
        }

        let stamp = self.clock.timestamp_micros().max(self.last_stamp + 1);
        self.last_stamp = stamp;
        let output = match Frame::new(width, height, false, false, stamp, canvas) {
            Ok(frame) => frame,
            Err(error) => {
                tracing::error!(%error, "Compositor produced an invalid canvas");
                return false;
            }
        };

        self.router.broadcast(&output);

        if let Some(preview) = &mut self.preview {
            if !preview.present(&output) {
                tracing::info!("Preview surface closed, stopping draw loop");
                self.stop_flag.store(true, Ordering::SeqCst);
                return false;
            }
        }

        true
    }
}
