//! The reader side of a shared-memory channel.

use std::sync::atomic::{fence, Ordering};
use std::sync::{Arc, Mutex};

use patchbay_common::error::{PatchbayError, PatchbayResult};
use patchbay_frame::frame::NO_FRAME_TIMESTAMP;
use patchbay_frame::{lock_unpoisoned, Frame, Latest, VideoSource};

use crate::region::{ShmRegion, MAGIC, SLOT_COUNT};

struct ReaderState {
    cached: Option<Arc<Frame>>,
    wire_timestamp: Option<u64>,
}

/// Reader attached to a named shared-memory channel.
///
/// Attaching to a name with no active writer fails with
/// `ChannelNotFound` — distinct from "writer exists but has produced no
/// frame yet", which simply polls as nothing-new. Each reader tracks the
/// wire timestamp it last materialized, so the channel is last-writer-
/// wins: intermediate frames a slow reader missed are skipped silently.
pub struct IpcSource {
    region: ShmRegion,
    name: String,
    width: u32,
    height: u32,
    channels: u32,
    state: Mutex<ReaderState>,
}

impl IpcSource {
    pub fn open(name: &str) -> PatchbayResult<Self> {
        let region = ShmRegion::open(name)?;

        let header = region.header();
        if header.magic.load(Ordering::Acquire) != MAGIC {
            return Err(PatchbayError::ipc(format!(
                "channel {name:?} exists but is not initialized"
            )));
        }
        let width = header.width.load(Ordering::Relaxed);
        let height = header.height.load(Ordering::Relaxed);
        let channels = header.channels.load(Ordering::Relaxed);
        if width == 0 || height == 0 || !(channels == 3 || channels == 4) {
            return Err(PatchbayError::ipc(format!(
                "channel {name:?} header is malformed: {width}x{height}x{channels}"
            )));
        }

        let frame_bytes = width as usize * height as usize * channels as usize;
        if region.len() < crate::region::region_size(frame_bytes) {
            return Err(PatchbayError::ipc(format!(
                "channel {name:?} region is truncated ({} bytes)",
                region.len()
            )));
        }

        Ok(Self {
            region,
            name: name.to_string(),
            width,
            height,
            channels,
            state: Mutex::new(ReaderState {
                cached: None,
                wire_timestamp: None,
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn has_alpha(&self) -> bool {
        self.channels == 4
    }

    fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * self.channels as usize
    }
}

fn cached_latest(state: &ReaderState) -> Latest {
    match &state.cached {
        Some(frame) => Latest::Frame(frame.clone()),
        None => Latest::None,
    }
}

impl VideoSource for IpcSource {
    fn latest(&self) -> Latest {
        let frame_bytes = self.frame_bytes();
        let header = self.region.header();

        // Acquire pairs with the writer's release publish: everything the
        // writer stored into the slot is visible after this load.
        let current = header.current.load(Ordering::Acquire) % SLOT_COUNT;
        let slot = self.region.slot_header(frame_bytes, current);

        let mut state = lock_unpoisoned(&self.state);

        let seq_before = slot.seq.load(Ordering::Acquire);
        if seq_before % 2 == 1 {
            // Writer is inside this slot right now; keep what we have.
            return cached_latest(&state);
        }

        let timestamp = slot.timestamp.load(Ordering::Relaxed);
        if timestamp == NO_FRAME_TIMESTAMP || state.wire_timestamp == Some(timestamp) {
            return cached_latest(&state);
        }

        let flipped = slot.flipped.load(Ordering::Relaxed) != 0;
        let mut pixels = vec![0u8; frame_bytes];
        unsafe {
            std::ptr::copy_nonoverlapping(
                self.region.slot_pixels(frame_bytes, current),
                pixels.as_mut_ptr(),
                frame_bytes,
            );
        }

        fence(Ordering::Acquire);
        if slot.seq.load(Ordering::Relaxed) != seq_before {
            // The writer lapped us mid-copy; the next poll will see the
            // newer publish.
            return cached_latest(&state);
        }

        match Frame::new(
            self.width,
            self.height,
            self.channels == 4,
            flipped,
            timestamp,
            pixels,
        ) {
            Ok(frame) => {
                state.cached = Some(Arc::new(frame));
                state.wire_timestamp = Some(timestamp);
            }
            Err(error) => {
                tracing::warn!(name = %self.name, %error, "Discarding malformed wire frame");
            }
        }

        cached_latest(&state)
    }
}
