//! Shared producer-side state for pump-driven sources.

use std::sync::{Arc, Mutex};

use patchbay_common::clock::MediaClock;
use patchbay_common::error::PatchbayResult;
use patchbay_frame::{
    lock_unpoisoned, Frame, Latest, Router, SharedTarget, VideoSource,
};

use crate::backend::RawImage;

struct ProducerState {
    latest: Option<Arc<Frame>>,
    last_stamp: u64,
    ended: bool,
}

/// The latest-frame cell plus fan-out router every pump-driven producer
/// (camera, player) shares with its pump thread.
///
/// The pump publishes; consumers poll the cell through [`VideoSource`]
/// and register targets on the router. Publishing stamps the frame from
/// the producer's own clock, keeping timestamps monotonic per producer.
pub struct ProducerCore {
    clock: MediaClock,
    router: Router,
    state: Mutex<ProducerState>,
}

impl ProducerCore {
    pub fn new() -> Self {
        Self {
            clock: MediaClock::start(),
            router: Router::new(),
            state: Mutex::new(ProducerState {
                latest: None,
                last_stamp: 0,
                ended: false,
            }),
        }
    }

    /// Stamp `image`, store it as the latest frame, and fan it out.
    pub fn publish(&self, image: RawImage) -> PatchbayResult<()> {
        let frame = {
            let mut state = lock_unpoisoned(&self.state);
            let stamp = self.clock.timestamp_micros().max(state.last_stamp + 1);
            state.last_stamp = stamp;
            let frame = Arc::new(Frame::new(
                image.width,
                image.height,
                image.has_alpha,
                image.flipped,
                stamp,
                image.pixels,
            )?);
            state.latest = Some(frame.clone());
            frame
        };
        // Fan out without holding the state lock: a slow target must not
        // stall concurrent polls of the latest cell.
        self.router.broadcast(&frame);
        Ok(())
    }

    /// Mark the stream terminated (or un-terminate it after a seek).
    pub fn set_ended(&self, ended: bool) {
        lock_unpoisoned(&self.state).ended = ended;
    }

    pub fn add_target(&self, target: &SharedTarget) {
        self.router.add_target(target);
    }
}

impl Default for ProducerCore {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoSource for ProducerCore {
    fn latest(&self) -> Latest {
        let state = lock_unpoisoned(&self.state);
        if state.ended {
            return Latest::EndOfStream;
        }
        match &state.latest {
            Some(frame) => Latest::Frame(frame.clone()),
            None => Latest::None,
        }
    }
}
