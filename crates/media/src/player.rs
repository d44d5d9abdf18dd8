//! Media-file playback sources.
//!
//! [`Player`] decodes on an internal pump thread and fans frames out as
//! they become due; [`LazyPlayer`] decodes on demand, advancing its
//! transport position against the wall clock only when polled. Both
//! speak the same transport-control surface and both surface end of
//! stream on the pull path rather than as an error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use patchbay_common::clock::MediaClock;
use patchbay_frame::{
    lock_unpoisoned, Frame, Latest, SharedSource, SharedTarget, VideoSource,
};

use crate::backend::{DecodeStep, MediaDecoder, MediaInfo};
use crate::pump::ProducerCore;

/// Transport state shared between the control surface and the pump.
struct Transport {
    playing: bool,
    /// Media position at the last start/stop/seek, in microseconds.
    base_micros: u64,
    /// Wall-clock anchor while playing.
    started_at: Option<Instant>,
    eof: bool,
}

impl Transport {
    fn position(&self, duration: u64) -> u64 {
        let position = match self.started_at {
            Some(anchor) if self.playing => {
                self.base_micros + anchor.elapsed().as_micros() as u64
            }
            _ => self.base_micros,
        };
        if duration > 0 {
            position.min(duration)
        } else {
            position
        }
    }
}

/// A media file decoded on an internal clock, fanning frames out to the
/// player's registered targets and latest-frame cell.
pub struct Player {
    info: MediaInfo,
    core: Arc<ProducerCore>,
    transport: Arc<Mutex<Transport>>,
    stop_flag: Arc<AtomicBool>,
    pump: Option<JoinHandle<()>>,
}

impl Player {
    pub fn new(mut decoder: Box<dyn MediaDecoder>) -> Self {
        let info = decoder.info();
        let core = Arc::new(ProducerCore::new());
        let transport = Arc::new(Mutex::new(Transport {
            playing: false,
            base_micros: 0,
            started_at: None,
            eof: false,
        }));
        let stop_flag = Arc::new(AtomicBool::new(false));

        let pump_core = core.clone();
        let pump_transport = transport.clone();
        let pump_stop = stop_flag.clone();
        let duration = info.duration_micros;
        let fps = if info.video_fps > 0.0 {
            info.video_fps
        } else {
            30.0
        };
        let idle = Duration::from_micros(((1_000_000.0 / fps) as u64 / 2).max(1_000));

        let pump = std::thread::spawn(move || {
            tracing::debug!("Player pump started");
            while !pump_stop.load(Ordering::SeqCst) {
                let due = {
                    let mut transport = lock_unpoisoned(&pump_transport);
                    if !transport.playing {
                        None
                    } else {
                        let position = transport.position(duration);
                        if duration > 0 && position >= duration {
                            transport.playing = false;
                            transport.base_micros = duration;
                            transport.started_at = None;
                            transport.eof = true;
                            None
                        } else {
                            Some(position)
                        }
                    }
                };

                let ended = {
                    let transport = lock_unpoisoned(&pump_transport);
                    transport.eof
                };
                if ended {
                    pump_core.set_ended(true);
                }

                if let Some(position) = due {
                    match decoder.decode_at(position) {
                        Ok(DecodeStep::Image(image)) => {
                            if let Err(error) = pump_core.publish(image) {
                                tracing::warn!(%error, "Player decoded an invalid frame");
                            }
                        }
                        Ok(DecodeStep::Unchanged) => {}
                        Ok(DecodeStep::EndOfStream) => {
                            let mut transport = lock_unpoisoned(&pump_transport);
                            transport.playing = false;
                            transport.started_at = None;
                            transport.eof = true;
                            drop(transport);
                            pump_core.set_ended(true);
                        }
                        Err(error) => {
                            tracing::warn!(%error, "Decoder failed, player pump exiting");
                            break;
                        }
                    }
                }

                std::thread::sleep(idle);
            }
            tracing::debug!("Player pump stopped");
        });

        Self {
            info,
            core,
            transport,
            stop_flag,
            pump: Some(pump),
        }
    }

    pub fn info(&self) -> &MediaInfo {
        &self.info
    }

    pub fn video_size(&self) -> (u32, u32) {
        (self.info.video_width, self.info.video_height)
    }

    pub fn duration(&self) -> u64 {
        self.info.duration_micros
    }

    pub fn is_playing(&self) -> bool {
        lock_unpoisoned(&self.transport).playing
    }

    pub fn is_eof_reached(&self) -> bool {
        lock_unpoisoned(&self.transport).eof
    }

    pub fn position(&self) -> u64 {
        lock_unpoisoned(&self.transport).position(self.info.duration_micros)
    }

    pub fn start(&self) {
        let mut transport = lock_unpoisoned(&self.transport);
        if transport.playing {
            return;
        }
        transport.playing = true;
        transport.started_at = Some(Instant::now());
    }

    pub fn stop(&self) {
        let mut transport = lock_unpoisoned(&self.transport);
        if !transport.playing {
            return;
        }
        transport.base_micros = transport.position(self.info.duration_micros);
        transport.playing = false;
        transport.started_at = None;
    }

    /// Seek to `position_micros`, clamped to the stream duration.
    /// Seeking away from the end clears the end-of-stream condition.
    pub fn set_position(&self, position_micros: u64) {
        let duration = self.info.duration_micros;
        let mut transport = lock_unpoisoned(&self.transport);
        transport.base_micros = if duration > 0 {
            position_micros.min(duration)
        } else {
            position_micros
        };
        transport.started_at = transport.playing.then(Instant::now);
        transport.eof = duration > 0 && transport.base_micros >= duration;
        let ended = transport.eof;
        drop(transport);
        self.core.set_ended(ended);
    }

    pub fn source(&self) -> SharedSource {
        self.core.clone()
    }

    pub fn add_target(&self, target: &SharedTarget) {
        self.core.add_target(target);
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        if let Some(pump) = self.pump.take() {
            if pump.join().is_err() {
                tracing::warn!("Player pump panicked");
            }
        }
    }
}

struct LazyState {
    decoder: Option<Box<dyn MediaDecoder>>,
    transport: Transport,
    cached: Option<Arc<Frame>>,
    last_stamp: u64,
}

/// Decode-on-demand playback: no pump thread, no fan-out. The transport
/// position advances against the wall clock while playing, and each poll
/// decodes whatever frame is due at that moment.
pub struct LazyPlayer {
    info: MediaInfo,
    clock: MediaClock,
    state: Mutex<LazyState>,
}

impl LazyPlayer {
    pub fn new(decoder: Box<dyn MediaDecoder>) -> Self {
        let info = decoder.info();
        Self {
            info,
            clock: MediaClock::start(),
            state: Mutex::new(LazyState {
                decoder: Some(decoder),
                transport: Transport {
                    playing: false,
                    base_micros: 0,
                    started_at: None,
                    eof: false,
                },
                cached: None,
                last_stamp: 0,
            }),
        }
    }

    pub fn info(&self) -> &MediaInfo {
        &self.info
    }

    pub fn video_size(&self) -> (u32, u32) {
        (self.info.video_width, self.info.video_height)
    }

    pub fn duration(&self) -> u64 {
        self.info.duration_micros
    }

    pub fn is_playing(&self) -> bool {
        lock_unpoisoned(&self.state).transport.playing
    }

    pub fn is_eof_reached(&self) -> bool {
        lock_unpoisoned(&self.state).transport.eof
    }

    pub fn position(&self) -> u64 {
        lock_unpoisoned(&self.state)
            .transport
            .position(self.info.duration_micros)
    }

    pub fn start(&self) {
        let mut state = lock_unpoisoned(&self.state);
        if state.transport.playing {
            return;
        }
        state.transport.playing = true;
        state.transport.started_at = Some(Instant::now());
    }

    pub fn stop(&self) {
        let duration = self.info.duration_micros;
        let mut state = lock_unpoisoned(&self.state);
        if !state.transport.playing {
            return;
        }
        state.transport.base_micros = state.transport.position(duration);
        state.transport.playing = false;
        state.transport.started_at = None;
    }

    pub fn set_position(&self, position_micros: u64) {
        let duration = self.info.duration_micros;
        let mut state = lock_unpoisoned(&self.state);
        state.transport.base_micros = if duration > 0 {
            position_micros.min(duration)
        } else {
            position_micros
        };
        state.transport.started_at = state.transport.playing.then(Instant::now);
        state.transport.eof = duration > 0 && state.transport.base_micros >= duration;
    }
}

impl VideoSource for LazyPlayer {
    fn latest(&self) -> Latest {
        let duration = self.info.duration_micros;
        let mut state = lock_unpoisoned(&self.state);

        let position = state.transport.position(duration);
        if state.transport.playing && duration > 0 && position >= duration {
            state.transport.playing = false;
            state.transport.base_micros = duration;
            state.transport.started_at = None;
            state.transport.eof = true;
        }
        if state.transport.eof {
            return Latest::EndOfStream;
        }

        if let Some(decoder) = state.decoder.as_mut() {
            match decoder.decode_at(position) {
                Ok(DecodeStep::Image(image)) => {
                    let stamp = self.clock.timestamp_micros().max(state.last_stamp + 1);
                    match Frame::new(
                        image.width,
                        image.height,
                        image.has_alpha,
                        image.flipped,
                        stamp,
                        image.pixels,
                    ) {
                        Ok(frame) => {
                            state.last_stamp = stamp;
                            state.cached = Some(Arc::new(frame));
                        }
                        Err(error) => {
                            tracing::warn!(%error, "Lazy player decoded an invalid frame");
                        }
                    }
                }
                Ok(DecodeStep::Unchanged) => {}
                Ok(DecodeStep::EndOfStream) => {
                    state.transport.playing = false;
                    state.transport.started_at = None;
                    state.transport.eof = true;
                    return Latest::EndOfStream;
                }
                Err(error) => {
                    tracing::warn!(%error, "Decoder failed, lazy player disabled");
                    state.decoder = None;
                }
            }
        }

        match &state.cached {
            Some(frame) => Latest::Frame(frame.clone()),
            None => Latest::None,
        }
    }
}
