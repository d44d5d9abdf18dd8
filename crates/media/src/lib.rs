//! Patchbay Media
//!
//! The I/O edge of the engine: sources that originate frames (camera,
//! window capture, media players, static images, synthetic patterns) and
//! the recorder/viewer glue that consumes them.
//!
//! Device access, demuxing/decoding, and container muxing are external
//! collaborators reached through the traits in [`backend`]; this crate
//! owns only the frame-pump plumbing that adapts them to the pull/push
//! contract. Every pump is a plain thread with an atomic stop flag,
//! joined when its owner drops.

pub mod backend;
pub mod camera;
pub mod device;
pub mod image_file;
pub mod pattern;
pub mod player;
pub mod pump;
pub mod recorder;
pub mod viewer;
pub mod window;

pub use backend::{CaptureBackend, CaptureFormat, DecodeStep, MediaDecoder, MediaInfo};
pub use backend::{RawImage, RecordSink};
pub use camera::Camera;
pub use device::{DeviceEnumerator, DeviceList};
pub use image_file::ImageFile;
pub use pattern::{PatternKind, TestPattern};
pub use player::{LazyPlayer, Player};
pub use recorder::{Recorder, RecorderConfig};
pub use viewer::Viewer;
pub use window::WindowCapture;
