//! In-process hand-off buffer between producer and consumer lifetimes.

use std::sync::{Arc, Mutex};

use patchbay_common::clock::MediaClock;
use patchbay_common::error::PatchbayResult;

use crate::contract::{lock_unpoisoned, Latest, VideoSource, VideoTarget};
use crate::frame::Frame;

/// A trivial source+target pair: `push` overwrites an internal
/// last-written buffer, `latest` drains it.
///
/// Ports decouple producer and consumer lifetimes — a producer can push
/// into a port it does not own, and a consumer can poll it whether or not
/// the producer still exists. Each write is restamped from the port's own
/// clock, so downstream pullers key staleness off the port, not off
/// whatever clock the producer used.
pub struct VideoPort {
    clock: MediaClock,
    slot: Mutex<PortSlot>,
}

#[derive(Default)]
struct PortSlot {
    frame: Option<Arc<Frame>>,
    last_stamp: u64,
}

impl VideoPort {
    pub fn new() -> Self {
        Self {
            clock: MediaClock::start(),
            slot: Mutex::new(PortSlot::default()),
        }
    }
}

impl Default for VideoPort {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoTarget for VideoPort {
    fn push(&self, frame: &Frame) -> PatchbayResult<()> {
        let mut slot = lock_unpoisoned(&self.slot);
        // Two pushes inside the same microsecond must still look distinct
        // to pullers keying staleness off the timestamp.
        let stamp = self.clock.timestamp_micros().max(slot.last_stamp + 1);
        slot.last_stamp = stamp;
        slot.frame = Some(Arc::new(frame.restamped(stamp)));
        Ok(())
    }
}

impl VideoSource for VideoPort {
    fn latest(&self) -> Latest {
        match lock_unpoisoned(&self.slot).frame.as_ref() {
            Some(frame) => Latest::Frame(frame.clone()),
            None => Latest::None,
        }
    }
}
