//! The pull/push exchange contract.
//!
//! Sources expose their most recent frame through [`VideoSource::latest`];
//! they never block and never queue. Consumers wrap a source in a
//! [`Puller`], which tracks the last timestamp it consumed so repeated
//! polls of an unchanged source answer [`PullResult::NoNewFrame`] instead
//! of re-delivering the same frame.
//!
//! Targets accept frames through [`VideoTarget::push`], which returns only
//! once the borrowed buffer has been fully consumed.

use std::sync::{Arc, Mutex, MutexGuard};

use patchbay_common::clock::MediaClock;
use patchbay_common::error::PatchbayResult;

use crate::frame::Frame;

/// What a source currently has on offer.
#[derive(Debug, Clone)]
pub enum Latest {
    /// The most recent frame the producer has ready.
    Frame(Arc<Frame>),
    /// Nothing has ever been produced.
    None,
    /// The stream has terminated; no further frames will appear.
    EndOfStream,
}

/// Result of one [`Puller::pull`] poll.
#[derive(Debug, Clone)]
pub enum PullResult {
    /// A frame not seen by this consumer before.
    Frame(Arc<Frame>),
    /// Nothing new since the previous pull.
    NoNewFrame,
    /// The stream has terminated.
    EndOfStream,
}

impl PullResult {
    /// The frame, if this poll produced one.
    pub fn frame(self) -> Option<Arc<Frame>> {
        match self {
            PullResult::Frame(frame) => Some(frame),
            _ => None,
        }
    }

    pub fn is_frame(&self) -> bool {
        matches!(self, PullResult::Frame(_))
    }

    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, PullResult::EndOfStream)
    }
}

/// Capability: produces frames on demand via non-blocking poll.
pub trait VideoSource: Send + Sync {
    /// The most recent frame this producer has ready.
    ///
    /// Must return immediately: a producer with nothing new simply answers
    /// with the same frame (same timestamp) as before, or [`Latest::None`]
    /// if it has never produced.
    fn latest(&self) -> Latest;
}

/// Capability: consumes frames via synchronous push.
pub trait VideoTarget: Send + Sync {
    /// Consume one frame.
    ///
    /// The buffer is caller-owned and only valid for the duration of the
    /// call; implementations must copy, encode, or render it before
    /// returning and must not retain the reference.
    fn push(&self, frame: &Frame) -> PatchbayResult<()>;
}

/// On-screen preview collaborator.
///
/// Window creation and event-loop handling live outside the engine;
/// consumers only hand over finished frames and learn whether the
/// surface is still open.
pub trait PreviewSurface: Send {
    /// Present one frame. Returns `false` once the surface has been
    /// closed, which terminates the caller's draw loop.
    fn present(&mut self, frame: &Frame) -> bool;
}

/// An owning handle to a source. Routers and consumers hold these (or
/// weak references derived from them); ownership stays with the creator.
pub type SharedSource = Arc<dyn VideoSource>;

/// An owning handle to a target.
pub type SharedTarget = Arc<dyn VideoTarget>;

/// Recover the guard from a poisoned lock; the protected state is plain
/// data and stays usable.
pub fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Per-consumer pull adapter with staleness tracking.
///
/// Several pullers may wrap the same source; each keeps its own notion of
/// "last seen", so a slow consumer skipping frames never affects another.
pub struct Puller {
    source: SharedSource,
    last_timestamp: Option<u64>,
}

impl Puller {
    pub fn new(source: SharedSource) -> Self {
        Self {
            source,
            last_timestamp: None,
        }
    }

    /// Poll the source once.
    ///
    /// Idempotent with respect to staleness: with no new producer frame in
    /// between, a second call yields [`PullResult::NoNewFrame`].
    pub fn pull(&mut self) -> PullResult {
        match self.source.latest() {
            Latest::Frame(frame) => {
                if self.last_timestamp == Some(frame.timestamp()) {
                    PullResult::NoNewFrame
                } else {
                    self.last_timestamp = Some(frame.timestamp());
                    PullResult::Frame(frame)
                }
            }
            Latest::None => PullResult::NoNewFrame,
            Latest::EndOfStream => PullResult::EndOfStream,
        }
    }

    /// The wrapped source handle.
    pub fn source(&self) -> &SharedSource {
        &self.source
    }
}

/// Push-side staging adapter.
///
/// Holds fixed geometry for a target and turns raw pixel buffers into
/// validated, clock-stamped frames. The staging step exists so external
/// feeders (tests, process bridges) can hand over bare bytes without
/// assembling frames themselves.
pub struct Pusher {
    target: SharedTarget,
    clock: MediaClock,
    last_stamp: u64,
    width: u32,
    height: u32,
    has_alpha: bool,
    flipped: bool,
}

impl Pusher {
    pub fn new(target: SharedTarget, width: u32, height: u32, has_alpha: bool) -> Self {
        Self {
            target,
            clock: MediaClock::start(),
            last_stamp: 0,
            width,
            height,
            has_alpha,
            flipped: false,
        }
    }

    pub fn set_flipped(&mut self, flipped: bool) {
        self.flipped = flipped;
    }

    /// Validate `pixels` against the staged geometry, stamp it from this
    /// pusher's clock, and push it through.
    pub fn push(&mut self, pixels: &[u8]) -> PatchbayResult<()> {
        let stamp = self.clock.timestamp_micros().max(self.last_stamp + 1);
        self.last_stamp = stamp;
        let frame = Frame::new(
            self.width,
            self.height,
            self.has_alpha,
            self.flipped,
            stamp,
            pixels.to_vec(),
        )?;
        self.target.push(&frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;

    struct ScriptedSource {
        frames: Mutex<Vec<Latest>>,
    }

    impl ScriptedSource {
        fn new(mut script: Vec<Latest>) -> Self {
            script.reverse();
            Self {
                frames: Mutex::new(script),
            }
        }
    }

    impl VideoSource for ScriptedSource {
        fn latest(&self) -> Latest {
            let mut script = lock_unpoisoned(&self.frames);
            if script.len() > 1 {
                script.pop().unwrap()
            } else {
                script.last().cloned().unwrap_or(Latest::None)
            }
        }
    }

    fn frame_at(timestamp: u64) -> Arc<Frame> {
        Arc::new(Frame::new(2, 2, false, false, timestamp, vec![0u8; 12]).unwrap())
    }

    #[test]
    fn test_pull_is_idempotent_on_stale_source() {
        let source = Arc::new(ScriptedSource::new(vec![Latest::Frame(frame_at(10))]));
        let mut puller = Puller::new(source);

        assert!(puller.pull().is_frame());
        assert!(matches!(puller.pull(), PullResult::NoNewFrame));
        assert!(matches!(puller.pull(), PullResult::NoNewFrame));
    }

    #[test]
    fn test_pull_sees_each_new_timestamp_once() {
        let source = Arc::new(ScriptedSource::new(vec![
            Latest::Frame(frame_at(10)),
            Latest::Frame(frame_at(11)),
        ]));
        let mut puller = Puller::new(source);

        assert_eq!(puller.pull().frame().unwrap().timestamp(), 10);
        assert_eq!(puller.pull().frame().unwrap().timestamp(), 11);
        assert!(matches!(puller.pull(), PullResult::NoNewFrame));
    }

    #[test]
    fn test_never_produced_source_pulls_as_no_new_frame() {
        let source = Arc::new(ScriptedSource::new(vec![Latest::None]));
        let mut puller = Puller::new(source);
        assert!(matches!(puller.pull(), PullResult::NoNewFrame));
    }

    #[test]
    fn test_end_of_stream_surfaces_on_pull_path() {
        let source = Arc::new(ScriptedSource::new(vec![
            Latest::Frame(frame_at(10)),
            Latest::EndOfStream,
        ]));
        let mut puller = Puller::new(source);
        assert!(puller.pull().is_frame());
        assert!(puller.pull().is_end_of_stream());
    }

    #[test]
    fn test_pusher_stages_and_validates_geometry() {
        let port = Arc::new(crate::port::VideoPort::new());
        let mut pusher = Pusher::new(port.clone() as SharedTarget, 2, 2, false);

        assert!(pusher.push(&[0u8; 11]).is_err());
        pusher.push(&[7u8; 12]).unwrap();

        let mut puller = Puller::new(port as SharedSource);
        let frame = puller.pull().frame().unwrap();
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.pixels()[0], 7);
    }

    #[test]
    fn test_independent_pullers_have_independent_staleness() {
        let source = Arc::new(ScriptedSource::new(vec![Latest::Frame(frame_at(10))]));
        let mut a = Puller::new(source.clone() as SharedSource);
        let mut b = Puller::new(source as SharedSource);

        assert!(a.pull().is_frame());
        assert!(matches!(a.pull(), PullResult::NoNewFrame));
        // b has not consumed timestamp 10 yet
        assert!(b.pull().is_frame());
    }
}
