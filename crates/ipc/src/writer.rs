//! The writer side of a shared-memory channel.

use std::sync::atomic::Ordering;

use patchbay_common::error::{PatchbayError, PatchbayResult};
use patchbay_frame::frame::NO_FRAME_TIMESTAMP;
use patchbay_frame::{Frame, VideoTarget};

use crate::region::{ShmRegion, INITIAL_SLOT, MAGIC, SLOT_COUNT};

/// Sole writer of a named shared-memory channel.
///
/// The region's geometry is fixed at creation; pushing a frame whose
/// dimensions or alpha flag disagree with it is a contract violation,
/// never a silent resize. The channel name is unlinked again when the
/// writer drops.
pub struct IpcTarget {
    region: ShmRegion,
    name: String,
    width: u32,
    height: u32,
    channels: u32,
}

impl IpcTarget {
    /// Create the channel. A name that already has a writer is an error.
    pub fn create(name: &str, width: u32, height: u32, has_alpha: bool) -> PatchbayResult<Self> {
        Self::build(name, width, height, has_alpha, false)
    }

    /// Create the channel, reclaiming a stale region a crashed writer
    /// may have left behind under the same name.
    pub fn create_or_replace(
        name: &str,
        width: u32,
        height: u32,
        has_alpha: bool,
    ) -> PatchbayResult<Self> {
        Self::build(name, width, height, has_alpha, true)
    }

    fn build(
        name: &str,
        width: u32,
        height: u32,
        has_alpha: bool,
        replace: bool,
    ) -> PatchbayResult<Self> {
        if width == 0 || height == 0 {
            return Err(PatchbayError::contract(format!(
                "channel geometry must be positive, got {width}x{height}"
            )));
        }
        let channels = if has_alpha { 4u32 } else { 3u32 };
        let frame_bytes = width as usize * height as usize * channels as usize;
        let total = crate::region::region_size(frame_bytes);

        let region = if replace {
            ShmRegion::create_or_replace(name, total)?
        } else {
            ShmRegion::create(name, total)?
        };

        let header = region.header();
        header.width.store(width, Ordering::Relaxed);
        header.height.store(height, Ordering::Relaxed);
        header.channels.store(channels, Ordering::Relaxed);
        header.current.store(INITIAL_SLOT, Ordering::Relaxed);
        for index in 0..SLOT_COUNT {
            let slot = region.slot_header(frame_bytes, index);
            slot.seq.store(0, Ordering::Relaxed);
            slot.timestamp.store(NO_FRAME_TIMESTAMP, Ordering::Relaxed);
            slot.flipped.store(0, Ordering::Relaxed);
        }
        // Geometry is in place; only now may attaching readers trust it.
        header.magic.store(MAGIC, Ordering::Release);

        tracing::debug!(name, width, height, channels, "IPC channel created");

        Ok(Self {
            region,
            name: name.to_string(),
            width,
            height,
            channels,
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

impl VideoTarget for IpcTarget {
    fn push(&self, frame: &Frame) -> PatchbayResult<()> {
        if frame.width() != self.width
            || frame.height() != self.height
            || frame.channels() != self.channels
        {
            return Err(PatchbayError::contract(format!(
                "frame {}x{}x{} does not match channel {:?} geometry {}x{}x{}",
                frame.width(),
                frame.height(),
                frame.channels(),
                self.name,
                self.width,
                self.height,
                self.channels,
            )));
        }

        let frame_bytes = self.frame_bytes();
        let header = self.region.header();
        let write_index = (header.current.load(Ordering::Relaxed) + 1) % SLOT_COUNT;
        let slot = self.region.slot_header(frame_bytes, write_index);

        // Seqlock open: odd while the slot contents are inconsistent.
        let seq = slot.seq.load(Ordering::Relaxed);
        slot.seq.store(seq.wrapping_add(1), Ordering::Relaxed);
        std::sync::atomic::fence(Ordering::Release);

        slot.flipped
            .store(frame.is_flipped() as u32, Ordering::Relaxed);
        slot.timestamp.store(frame.timestamp(), Ordering::Relaxed);
        unsafe {
            std::ptr::copy_nonoverlapping(
                frame.pixels().as_ptr(),
                self.region.slot_pixels(frame_bytes, write_index),
                frame_bytes,
            );
        }

        // Seqlock close, then publish the slot index. Readers acquire the
        // index first, so data written above is visible to them.
        slot.seq.store(seq.wrapping_add(2), Ordering::Release);
        header.current.store(write_index, Ordering::Release);
        Ok(())
    }
}
