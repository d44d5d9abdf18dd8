//! Static image source.

use std::path::Path;
use std::sync::Arc;

use patchbay_common::clock::MediaClock;
use patchbay_common::error::{PatchbayError, PatchbayResult};
use patchbay_frame::{Frame, Latest, VideoSource};

/// A single image decoded once at construction.
///
/// Every poll answers the same frame with the same timestamp, so a
/// puller sees it exactly once and nothing-new afterwards.
pub struct ImageFile {
    frame: Arc<Frame>,
}

impl ImageFile {
    /// Decode `path`, keeping an alpha channel if the file has one.
    pub fn open(path: impl AsRef<Path>) -> PatchbayResult<Self> {
        Self::open_with_alpha(path, true)
    }

    /// Decode `path`; with `keep_alpha` false the image is flattened to
    /// three channels regardless of the file's own format.
    pub fn open_with_alpha(path: impl AsRef<Path>, keep_alpha: bool) -> PatchbayResult<Self> {
        let path = path.as_ref();
        let decoded = image::open(path).map_err(|e| {
            PatchbayError::media(format!("failed to decode {}: {e}", path.display()))
        })?;

        let has_alpha = keep_alpha && decoded.color().has_alpha();
        let (width, height) = (decoded.width(), decoded.height());
        let pixels = if has_alpha {
            decoded.to_rgba8().into_raw()
        } else {
            decoded.to_rgb8().into_raw()
        };

        let frame = Frame::new(
            width,
            height,
            has_alpha,
            false,
            MediaClock::start().timestamp_micros().max(1),
            pixels,
        )?;

        tracing::debug!(path = %path.display(), width, height, has_alpha, "Image loaded");

        Ok(Self {
            frame: Arc::new(frame),
        })
    }

    pub fn width(&self) -> u32 {
        self.frame.width()
    }

    pub fn height(&self) -> u32 {
        self.frame.height()
    }
}

impl VideoSource for ImageFile {
    fn latest(&self) -> Latest {
        Latest::Frame(self.frame.clone())
    }
}
