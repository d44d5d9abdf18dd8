//! Recorder glue: binds one source to an encoding sink.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use patchbay_common::clock::{MediaClock, RateController};
use patchbay_common::error::{PatchbayError, PatchbayResult};
use patchbay_frame::{lock_unpoisoned, PullResult, Puller, SharedSource};

use crate::backend::RecordSink;

/// Recorder parameters.
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Poll rate of the record pump; the source is sampled at this rate,
    /// so a source producing faster than this drops frames here.
    pub fps: u32,

    /// Audio input device index handed to the sink's audio path, if the
    /// sink records audio at all.
    pub audio_device: Option<usize>,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            fps: 30,
            audio_device: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecorderState {
    Idle,
    Recording,
    Stopped,
}

/// Pulls from exactly one bound source and feeds every fresh frame to a
/// [`RecordSink`].
///
/// `stop` halts the pump and finalizes the sink so the backing file is
/// valid even if the process exits immediately after; dropping a
/// recorder that is still running does the same.
pub struct Recorder {
    config: RecorderConfig,
    sink: Arc<Mutex<Box<dyn RecordSink>>>,
    source: Option<SharedSource>,
    state: RecorderState,
    stop_flag: Arc<AtomicBool>,
    pump: Option<JoinHandle<()>>,
}

impl Recorder {
    pub fn new(sink: Box<dyn RecordSink>, config: RecorderConfig) -> Self {
        Self {
            config,
            sink: Arc::new(Mutex::new(sink)),
            source: None,
            state: RecorderState::Idle,
            stop_flag: Arc::new(AtomicBool::new(false)),
            pump: None,
        }
    }

    /// Bind the upstream source. Rebinding while recording is an error.
    pub fn set_source(&mut self, source: SharedSource) -> PatchbayResult<()> {
        if self.state == RecorderState::Recording {
            return Err(PatchbayError::media(
                "cannot rebind the source while recording",
            ));
        }
        self.source = Some(source);
        Ok(())
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecorderState::Recording
    }

    /// Start the record pump.
    pub fn start(&mut self) -> PatchbayResult<()> {
        if self.state == RecorderState::Recording {
            return Err(PatchbayError::media("recorder already started"));
        }
        if self.state == RecorderState::Stopped {
            return Err(PatchbayError::media("recorder already finalized"));
        }
        let source = self
            .source
            .clone()
            .ok_or_else(|| PatchbayError::media("no source bound to recorder"))?;

        tracing::info!(
            fps = self.config.fps,
            audio_device = ?self.config.audio_device,
            "Recording started"
        );

        self.stop_flag.store(false, Ordering::SeqCst);
        let stop_flag = self.stop_flag.clone();
        let sink = self.sink.clone();
        let fps = self.config.fps;

        self.pump = Some(std::thread::spawn(move || {
            let clock = MediaClock::start();
            let mut rate = RateController::new(fps);
            let mut puller = Puller::new(source);
            let mut written: u64 = 0;

            while !stop_flag.load(Ordering::SeqCst) {
                if rate.should_tick(clock.timestamp_micros()) {
                    match puller.pull() {
                        PullResult::Frame(frame) => {
                            let mut sink = lock_unpoisoned(&sink);
                            if let Err(error) = sink.write_video(&frame) {
                                tracing::warn!(%error, "Sink rejected a frame, recording pump exiting");
                                break;
                            }
                            written += 1;
                        }
                        PullResult::NoNewFrame => {}
                        PullResult::EndOfStream => {
                            tracing::info!(written, "Source ended, recording pump exiting");
                            break;
                        }
                    }
                }
                std::thread::sleep(Duration::from_millis(1));
            }
            tracing::debug!(written, "Recording pump stopped");
        }));

        self.state = RecorderState::Recording;
        Ok(())
    }

    /// Stop the pump and finalize the sink.
    pub fn stop(&mut self) -> PatchbayResult<()> {
        if self.state != RecorderState::Recording {
            return Err(PatchbayError::media("recorder not started"));
        }
        self.shutdown()?;
        Ok(())
    }

    fn shutdown(&mut self) -> PatchbayResult<()> {
        self.stop_flag.store(true, Ordering::SeqCst);
        if let Some(pump) = self.pump.take() {
            if pump.join().is_err() {
                tracing::warn!("Recording pump panicked");
            }
        }
        self.state = RecorderState::Stopped;
        lock_unpoisoned(&self.sink).finalize()?;
        tracing::info!("Recording finalized");
        Ok(())
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        if self.state == RecorderState::Recording {
            if let Err(error) = self.shutdown() {
                tracing::warn!(%error, "Failed to finalize recording on drop");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchbay_frame::{Frame, VideoPort, VideoTarget};

    #[derive(Default)]
    struct SinkLog {
        frames: Vec<u64>,
        finalized: u32,
    }

    struct LoggingSink {
        log: Arc<Mutex<SinkLog>>,
    }

    impl RecordSink for LoggingSink {
        fn write_video(&mut self, frame: &Frame) -> PatchbayResult<()> {
            self.log.lock().unwrap().frames.push(frame.timestamp());
            Ok(())
        }

        fn finalize(&mut self) -> PatchbayResult<()> {
            self.log.lock().unwrap().finalized += 1;
            Ok(())
        }
    }

    fn recorder_with_log() -> (Recorder, Arc<Mutex<SinkLog>>) {
        let log = Arc::new(Mutex::new(SinkLog::default()));
        let recorder = Recorder::new(
            Box::new(LoggingSink { log: log.clone() }),
            RecorderConfig {
                fps: 1000,
                audio_device: None,
            },
        );
        (recorder, log)
    }

    #[test]
    fn test_recorder_requires_a_source() {
        let (mut recorder, _log) = recorder_with_log();
        assert!(recorder.start().is_err());
    }

    #[test]
    fn test_recorder_writes_frames_and_finalizes_once() {
        let (mut recorder, log) = recorder_with_log();
        let port = Arc::new(VideoPort::new());
        recorder.set_source(port.clone() as SharedSource).unwrap();
        recorder.start().unwrap();

        let frame = Frame::filled(2, 2, false, &[1, 2, 3], 1).unwrap();
        for _ in 0..3 {
            port.push(&frame).unwrap();
            std::thread::sleep(Duration::from_millis(5));
        }

        recorder.stop().unwrap();
        let log = log.lock().unwrap();
        assert!(!log.frames.is_empty(), "no frames reached the sink");
        assert_eq!(log.finalized, 1);
    }

    #[test]
    fn test_second_stop_is_an_error_and_does_not_refinalize() {
        let (mut recorder, log) = recorder_with_log();
        let port = Arc::new(VideoPort::new());
        recorder.set_source(port as SharedSource).unwrap();
        recorder.start().unwrap();
        recorder.stop().unwrap();

        assert!(recorder.stop().is_err());
        assert_eq!(log.lock().unwrap().finalized, 1);
    }

    #[test]
    fn test_timestamps_reaching_sink_are_monotonic() {
        let (mut recorder, log) = recorder_with_log();
        let port = Arc::new(VideoPort::new());
        recorder.set_source(port.clone() as SharedSource).unwrap();
        recorder.start().unwrap();

        let frame = Frame::filled(2, 2, false, &[9, 9, 9], 1).unwrap();
        for _ in 0..5 {
            port.push(&frame).unwrap();
            std::thread::sleep(Duration::from_millis(2));
        }
        recorder.stop().unwrap();

        let frames = log.lock().unwrap().frames.clone();
        assert!(frames.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_drop_while_recording_finalizes() {
        let log = {
            let (mut recorder, log) = recorder_with_log();
            let port = Arc::new(VideoPort::new());
            recorder.set_source(port as SharedSource).unwrap();
            recorder.start().unwrap();
            log
        };
        assert_eq!(log.lock().unwrap().finalized, 1);
    }
}
