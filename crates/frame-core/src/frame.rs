//! The frame value type exchanged between all components.

use patchbay_common::error::{PatchbayError, PatchbayResult};

/// Reserved wire-level timestamp meaning "no frame".
///
/// Never a valid producer timestamp; `Frame::new` rejects it. Inside the
/// shared-memory transport it marks slots that have not been written yet.
pub const NO_FRAME_TIMESTAMP: u64 = u64::MAX;

/// One decoded image buffer plus metadata.
///
/// Pixels are row-major, one byte per channel, no row padding: 3 channels
/// without alpha, 4 with. `flipped` marks bottom-up row order; consumers
/// must respect it rather than assume top-down.
///
/// A frame is immutable once constructed and is handed around behind
/// `Arc` by sources; targets receive a borrow and must not retain it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    has_alpha: bool,
    flipped: bool,
    timestamp: u64,
    pixels: Vec<u8>,
}

impl Frame {
    /// Construct a frame, validating the buffer against its geometry.
    ///
    /// A buffer whose length disagrees with `width * height * channels`
    /// is a contract error, not a recoverable condition.
    pub fn new(
        width: u32,
        height: u32,
        has_alpha: bool,
        flipped: bool,
        timestamp: u64,
        pixels: Vec<u8>,
    ) -> PatchbayResult<Self> {
        if width == 0 || height == 0 {
            return Err(PatchbayError::contract(format!(
                "frame dimensions must be positive, got {width}x{height}"
            )));
        }
        if timestamp == NO_FRAME_TIMESTAMP {
            return Err(PatchbayError::contract(
                "frame timestamp collides with the reserved no-frame value",
            ));
        }
        let channels = if has_alpha { 4u32 } else { 3u32 };
        let expected = width as usize * height as usize * channels as usize;
        if pixels.len() != expected {
            return Err(PatchbayError::contract(format!(
                "pixel buffer is {} bytes, expected {expected} for {width}x{height}x{channels}",
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            has_alpha,
            flipped,
            timestamp,
            pixels,
        })
    }

    /// A frame filled with a single solid color.
    ///
    /// `color` must have one byte per channel (3 without alpha, 4 with).
    pub fn filled(
        width: u32,
        height: u32,
        has_alpha: bool,
        color: &[u8],
        timestamp: u64,
    ) -> PatchbayResult<Self> {
        let channels = if has_alpha { 4usize } else { 3usize };
        if color.len() != channels {
            return Err(PatchbayError::contract(format!(
                "fill color has {} bytes, expected {channels}",
                color.len()
            )));
        }
        let mut pixels = Vec::with_capacity(width as usize * height as usize * channels);
        for _ in 0..(width as usize * height as usize) {
            pixels.extend_from_slice(color);
        }
        Self::new(width, height, has_alpha, false, timestamp, pixels)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn has_alpha(&self) -> bool {
        self.has_alpha
    }

    /// Channel count: 4 iff alpha is present, else 3.
    pub fn channels(&self) -> u32 {
        if self.has_alpha {
            4
        } else {
            3
        }
    }

    pub fn is_flipped(&self) -> bool {
        self.flipped
    }

    /// Producer timestamp in microseconds. Monotonic within one producer's
    /// stream; not comparable across unrelated producers.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.width as usize * self.channels() as usize
    }

    /// The pixel at `(x, y)` in top-down coordinates, honoring `flipped`.
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let row = if self.flipped {
            self.height - 1 - y
        } else {
            y
        };
        let offset = row as usize * self.stride() + x as usize * self.channels() as usize;
        &self.pixels[offset..offset + self.channels() as usize]
    }

    /// Copy of this frame carrying a different timestamp.
    pub fn restamped(&self, timestamp: u64) -> Self {
        Self {
            width: self.width,
            height: self.height,
            has_alpha: self.has_alpha,
            flipped: self.flipped,
            timestamp,
            pixels: self.pixels.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_valid_frame_construction() {
        let frame = Frame::new(4, 2, false, false, 7, vec![0u8; 24]).unwrap();
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.stride(), 12);
        assert_eq!(frame.timestamp(), 7);
    }

    #[test]
    fn test_alpha_changes_channel_count() {
        let frame = Frame::new(4, 2, true, false, 1, vec![0u8; 32]).unwrap();
        assert_eq!(frame.channels(), 4);
    }

    #[test]
    fn test_bad_buffer_length_is_rejected() {
        assert!(Frame::new(4, 2, false, false, 1, vec![0u8; 23]).is_err());
        assert!(Frame::new(4, 2, true, false, 1, vec![0u8; 24]).is_err());
    }

    #[test]
    fn test_zero_dimensions_are_rejected() {
        assert!(Frame::new(0, 2, false, false, 1, vec![]).is_err());
        assert!(Frame::new(4, 0, false, false, 1, vec![]).is_err());
    }

    #[test]
    fn test_reserved_timestamp_is_rejected() {
        assert!(Frame::new(1, 1, false, false, NO_FRAME_TIMESTAMP, vec![0u8; 3]).is_err());
    }

    #[test]
    fn test_flipped_pixel_addressing() {
        // 1x2, rows: top = red, bottom = green, stored bottom-up
        let pixels = vec![0, 255, 0, 255, 0, 0];
        let frame = Frame::new(1, 2, false, true, 1, pixels).unwrap();
        assert_eq!(frame.pixel(0, 0), &[255, 0, 0]);
        assert_eq!(frame.pixel(0, 1), &[0, 255, 0]);
    }

    proptest! {
        #[test]
        fn prop_buffer_length_invariant(
            width in 1u32..64,
            height in 1u32..64,
            has_alpha: bool,
            slack in -2i64..=2,
        ) {
            let channels = if has_alpha { 4 } else { 3 };
            let exact = width as i64 * height as i64 * channels;
            let len = (exact + slack).max(0) as usize;
            let result = Frame::new(width, height, has_alpha, false, 1, vec![0u8; len]);
            prop_assert_eq!(result.is_ok(), slack == 0);
        }
    }
}
