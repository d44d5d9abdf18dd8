//! Collaborator traits at the I/O seams.
//!
//! Implementations wrap whatever platform capture API, demuxer, or
//! muxer the embedding application uses. The engine never links those
//! libraries itself; it only drives these traits from its pumps.

use patchbay_common::error::PatchbayResult;
use patchbay_frame::Frame;

/// Pixel data as produced by a device or decoder, before the engine
/// stamps it with a producer timestamp.
#[derive(Debug, Clone)]
pub struct RawImage {
    pub width: u32,
    pub height: u32,
    pub has_alpha: bool,
    pub flipped: bool,
    pub pixels: Vec<u8>,
}

/// Fixed output format of a capture device.
#[derive(Debug, Clone, Copy)]
pub struct CaptureFormat {
    pub width: u32,
    pub height: u32,
    /// Native capture cadence in frames per second.
    pub frame_rate: u32,
}

/// A live capture device (camera or window).
pub trait CaptureBackend: Send {
    fn format(&self) -> CaptureFormat;

    /// Grab the next frame if the device has one ready.
    ///
    /// `Ok(None)` means nothing new yet; an error means the device is
    /// gone (unplugged, window closed). The engine treats device loss as
    /// permanent and will not call again after an error.
    fn capture(&mut self) -> PatchbayResult<Option<RawImage>>;
}

/// Media-file properties reported by a decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct MediaInfo {
    pub duration_micros: u64,
    pub has_video: bool,
    pub video_width: u32,
    pub video_height: u32,
    pub video_fps: f64,
    pub video_bitrate: u32,
    pub has_audio: bool,
    pub audio_sample_rate: u32,
    pub audio_channels: u32,
    pub audio_bitrate: u32,
}

/// One decode request's outcome.
#[derive(Debug, Clone)]
pub enum DecodeStep {
    /// The frame covering the requested position.
    Image(RawImage),
    /// The requested position maps to the frame already delivered.
    Unchanged,
    /// Playback position is past the end of the stream.
    EndOfStream,
}

/// A seekable media-file decoder (demux/decode internals are the
/// collaborator's business).
pub trait MediaDecoder: Send {
    fn info(&self) -> MediaInfo;

    /// Decode the frame covering `position_micros` of media time.
    fn decode_at(&mut self, position_micros: u64) -> PatchbayResult<DecodeStep>;
}

/// An encoding/muxing sink fed by a [`crate::Recorder`].
///
/// `finalize` must leave a valid file behind; the recorder guarantees it
/// is called exactly once, even when the recorder is dropped mid-stream.
/// Audio capture and muxing, if the sink does any, are synchronized by
/// the sink against the video timestamps it receives here.
pub trait RecordSink: Send {
    fn write_video(&mut self, frame: &Frame) -> PatchbayResult<()>;

    fn finalize(&mut self) -> PatchbayResult<()>;
}
