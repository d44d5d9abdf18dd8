//! Clock and timing utilities for frame timestamps.
//!
//! Every Patchbay producer stamps the frames it emits from a monotonic
//! clock anchored at the moment the producer was created. Timestamps are
//! microseconds since that epoch and are only comparable within a single
//! producer's stream.

use std::time::Instant;

/// A monotonic clock that provides microsecond timestamps relative to
/// a fixed epoch (the moment the owning producer was created).
#[derive(Debug, Clone)]
pub struct MediaClock {
    /// The instant the producer started.
    epoch: Instant,

    /// Wall-clock time at epoch (ISO 8601 string).
    epoch_wall: String,
}

impl MediaClock {
    /// Create a new clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Microseconds elapsed since the epoch.
    ///
    /// This is the producer timestamp domain: monotonic, per-producer,
    /// never the reserved sentinel value.
    pub fn timestamp_micros(&self) -> u64 {
        self.epoch.elapsed().as_micros() as u64
    }

    /// Seconds elapsed since the epoch.
    pub fn elapsed_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Wall-clock time at the epoch.
    pub fn epoch_wall(&self) -> &str {
        &self.epoch_wall
    }

    /// The underlying epoch instant.
    pub fn epoch(&self) -> Instant {
        self.epoch
    }

    /// Convert an elapsed microsecond value to seconds.
    pub fn micros_to_secs(micros: u64) -> f64 {
        micros as f64 / 1_000_000.0
    }

    /// Convert seconds to microseconds.
    pub fn secs_to_micros(secs: f64) -> u64 {
        (secs * 1_000_000.0) as u64
    }
}

/// Frame rate controller for pump loops.
#[derive(Debug)]
pub struct RateController {
    target_interval_micros: u64,
    last_tick_micros: Option<u64>,
}

impl RateController {
    /// Create a controller targeting the given Hz rate.
    pub fn new(target_hz: u32) -> Self {
        Self {
            target_interval_micros: 1_000_000 / target_hz.max(1) as u64,
            last_tick_micros: None,
        }
    }

    /// Check if enough time has passed for the next tick.
    /// Returns true and updates internal state if ready.
    /// The first call always returns true.
    pub fn should_tick(&mut self, current_micros: u64) -> bool {
        match self.last_tick_micros {
            None => {
                self.last_tick_micros = Some(current_micros);
                true
            }
            Some(last) if current_micros >= last + self.target_interval_micros => {
                self.last_tick_micros = Some(current_micros);
                true
            }
            _ => false,
        }
    }

    /// Target interval in microseconds.
    pub fn interval_micros(&self) -> u64 {
        self.target_interval_micros
    }
}
