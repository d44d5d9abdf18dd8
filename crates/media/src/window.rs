//! Window capture source.

use std::sync::{Arc, Mutex};

use patchbay_common::clock::MediaClock;
use patchbay_frame::{lock_unpoisoned, Frame, Latest, VideoSource};

use crate::backend::CaptureBackend;

struct WindowState {
    backend: Option<Box<dyn CaptureBackend>>,
    cached: Option<Arc<Frame>>,
    last_stamp: u64,
}

/// Captures a window's content on demand: each poll asks the backend for
/// a fresh grab, so the capture cadence is whatever the consumer's poll
/// rate is.
///
/// When the window goes away the backend errors once; from then on every
/// poll keeps answering with the stale cached frame, which downstream
/// pullers see as nothing-new.
pub struct WindowCapture {
    clock: MediaClock,
    state: Mutex<WindowState>,
}

impl WindowCapture {
    pub fn new(backend: Box<dyn CaptureBackend>) -> Self {
        Self {
            clock: MediaClock::start(),
            state: Mutex::new(WindowState {
                backend: Some(backend),
                cached: None,
                last_stamp: 0,
            }),
        }
    }
}

impl VideoSource for WindowCapture {
    fn latest(&self) -> Latest {
        let mut state = lock_unpoisoned(&self.state);

        if let Some(backend) = state.backend.as_mut() {
            match backend.capture() {
                Ok(Some(image)) => {
                    let stamp = self.clock.timestamp_micros().max(state.last_stamp + 1);
                    match Frame::new(
                        image.width,
                        image.height,
                        image.has_alpha,
                        image.flipped,
                        stamp,
                        image.pixels,
                    ) {
                        Ok(frame) => {
                            state.last_stamp = stamp;
                            state.cached = Some(Arc::new(frame));
                        }
                        Err(error) => {
                            tracing::warn!(%error, "Window capture produced an invalid frame");
                        }
                    }
                }
                Ok(None) => {}
                Err(error) => {
                    tracing::warn!(%error, "Window lost, capture disabled");
                    state.backend = None;
                }
            }
        }

        match &state.cached {
            Some(frame) => Latest::Frame(frame.clone()),
            None => Latest::None,
        }
    }
}
