//! Synthetic test-pattern source.

use std::sync::Mutex;

use patchbay_common::clock::MediaClock;
use patchbay_common::error::{PatchbayError, PatchbayResult};
use patchbay_frame::{lock_unpoisoned, Frame, Latest, VideoSource};

/// What the pattern generator draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    /// Eight classic vertical color bars.
    ColorBars,
    /// A horizontally scrolling gradient; the phase advances with the
    /// pattern clock so every poll yields a visibly different frame.
    Gradient,
    /// One solid color.
    Solid([u8; 3]),
}

const BAR_COLORS: [[u8; 3]; 8] = [
    [255, 255, 255],
    [255, 255, 0],
    [0, 255, 255],
    [0, 255, 0],
    [255, 0, 255],
    [255, 0, 0],
    [0, 0, 255],
    [0, 0, 0],
];

/// Render one 3-channel pattern frame. `phase` shifts the gradient;
/// bars and solids ignore it.
pub fn render(kind: PatternKind, width: u32, height: u32, phase: u64) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(width as usize * height as usize * 3);
    for y in 0..height {
        for x in 0..width {
            let color = match kind {
                PatternKind::ColorBars => {
                    let band = (x as usize * BAR_COLORS.len()) / width as usize;
                    BAR_COLORS[band.min(BAR_COLORS.len() - 1)]
                }
                PatternKind::Gradient => {
                    let r = ((x as u64 + phase) % 256) as u8;
                    let g = ((y as u64 * 255) / height.max(1) as u64) as u8;
                    [r, g, 128]
                }
                PatternKind::Solid(color) => color,
            };
            pixels.extend_from_slice(&color);
        }
    }
    pixels
}

/// A continuously regenerating synthetic source, useful wherever a real
/// capture device is unavailable: demos, soak tests, channel probes.
pub struct TestPattern {
    width: u32,
    height: u32,
    kind: PatternKind,
    clock: MediaClock,
    last_stamp: Mutex<u64>,
}

impl TestPattern {
    pub fn new(width: u32, height: u32, kind: PatternKind) -> PatchbayResult<Self> {
        if width == 0 || height == 0 {
            return Err(PatchbayError::contract(format!(
                "pattern dimensions must be positive, got {width}x{height}"
            )));
        }
        Ok(Self {
            width,
            height,
            kind,
            clock: MediaClock::start(),
            last_stamp: Mutex::new(0),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

impl VideoSource for TestPattern {
    fn latest(&self) -> Latest {
        let stamp = {
            let mut last = lock_unpoisoned(&self.last_stamp);
            let stamp = self.clock.timestamp_micros().max(*last + 1);
            *last = stamp;
            stamp
        };
        // Animate at roughly 60 gradient steps per second.
        let phase = stamp / 16_666;
        let pixels = render(self.kind, self.width, self.height, phase);
        match Frame::new(self.width, self.height, false, false, stamp, pixels) {
            Ok(frame) => Latest::Frame(std::sync::Arc::new(frame)),
            Err(_) => Latest::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchbay_frame::{Puller, SharedSource};
    use std::sync::Arc;

    #[test]
    fn test_color_bars_have_eight_bands() {
        let pixels = render(PatternKind::ColorBars, 8, 1, 0);
        for (band, color) in BAR_COLORS.iter().enumerate() {
            assert_eq!(&pixels[band * 3..band * 3 + 3], color);
        }
    }

    #[test]
    fn test_gradient_phase_shifts_content() {
        let a = render(PatternKind::Gradient, 16, 4, 0);
        let b = render(PatternKind::Gradient, 16, 4, 7);
        assert_ne!(a, b);
    }

    #[test]
    fn test_solid_fills_every_pixel() {
        let pixels = render(PatternKind::Solid([3, 2, 1]), 4, 4, 0);
        assert!(pixels.chunks(3).all(|chunk| chunk == [3, 2, 1]));
    }

    #[test]
    fn test_pattern_source_always_has_a_fresh_frame() {
        let source = Arc::new(TestPattern::new(8, 8, PatternKind::ColorBars).unwrap());
        let mut puller = Puller::new(source as SharedSource);
        assert!(puller.pull().is_frame());
        assert!(puller.pull().is_frame());
    }

    #[test]
    fn test_zero_size_pattern_is_rejected() {
        assert!(TestPattern::new(0, 8, PatternKind::ColorBars).is_err());
    }
}
