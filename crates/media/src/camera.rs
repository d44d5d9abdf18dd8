//! Live camera source.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use patchbay_frame::{SharedSource, SharedTarget};

use crate::backend::{CaptureBackend, CaptureFormat};
use crate::pump::ProducerCore;

/// A capture device pumped at its native cadence.
///
/// The pump thread starts on construction and reads the backend until
/// the camera drops or the device is lost. Device loss is permanent:
/// the pump exits and pulls simply stop yielding new frames.
pub struct Camera {
    index: usize,
    format: CaptureFormat,
    core: Arc<ProducerCore>,
    stop_flag: Arc<AtomicBool>,
    pump: Option<JoinHandle<()>>,
}

impl Camera {
    /// Open the device at `index` (as enumerated by the application's
    /// [`crate::DeviceEnumerator`]) through the given backend.
    pub fn new(index: usize, mut backend: Box<dyn CaptureBackend>) -> Self {
        let format = backend.format();
        let core = Arc::new(ProducerCore::new());
        let stop_flag = Arc::new(AtomicBool::new(false));

        let pump_core = core.clone();
        let pump_stop = stop_flag.clone();
        let idle = Duration::from_micros(1_000_000 / (format.frame_rate.max(1) as u64 * 4));
        let pump = std::thread::spawn(move || {
            tracing::debug!(index, "Camera pump started");
            while !pump_stop.load(Ordering::SeqCst) {
                match backend.capture() {
                    Ok(Some(image)) => {
                        if let Err(error) = pump_core.publish(image) {
                            tracing::warn!(index, %error, "Camera produced an invalid frame");
                        }
                    }
                    Ok(None) => std::thread::sleep(idle),
                    Err(error) => {
                        tracing::warn!(index, %error, "Camera device lost, pump exiting");
                        break;
                    }
                }
            }
            tracing::debug!(index, "Camera pump stopped");
        });

        Self {
            index,
            format,
            core,
            stop_flag,
            pump: Some(pump),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn width(&self) -> u32 {
        self.format.width
    }

    pub fn height(&self) -> u32 {
        self.format.height
    }

    /// Pull-side handle onto this camera's latest frame.
    pub fn source(&self) -> SharedSource {
        self.core.clone()
    }

    /// Register a target to receive every captured frame.
    pub fn add_target(&self, target: &SharedTarget) {
        self.core.add_target(target);
    }
}

impl Drop for Camera {
    fn drop(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        if let Some(pump) = self.pump.take() {
            if pump.join().is_err() {
                tracing::warn!(index = self.index, "Camera pump panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RawImage;
    use patchbay_common::error::{PatchbayError, PatchbayResult};
    use patchbay_frame::{Puller, VideoPort};

    struct CountingBackend {
        produced: u32,
        fail_after: Option<u32>,
    }

    impl CaptureBackend for CountingBackend {
        fn format(&self) -> CaptureFormat {
            CaptureFormat {
                width: 2,
                height: 2,
                frame_rate: 1000,
            }
        }

        fn capture(&mut self) -> PatchbayResult<Option<RawImage>> {
            if let Some(limit) = self.fail_after {
                if self.produced >= limit {
                    return Err(PatchbayError::media("device unplugged"));
                }
            }
            self.produced += 1;
            Ok(Some(RawImage {
                width: 2,
                height: 2,
                has_alpha: false,
                flipped: false,
                pixels: vec![self.produced as u8; 12],
            }))
        }
    }

    fn wait_for_frame(puller: &mut Puller) -> Option<std::sync::Arc<patchbay_frame::Frame>> {
        for _ in 0..200 {
            if let Some(frame) = puller.pull().frame() {
                return Some(frame);
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        None
    }

    #[test]
    fn test_camera_pumps_frames_to_source_and_targets() {
        let camera = Camera::new(
            0,
            Box::new(CountingBackend {
                produced: 0,
                fail_after: None,
            }),
        );
        let port = Arc::new(VideoPort::new());
        camera.add_target(&(port.clone() as SharedTarget));

        let mut puller = Puller::new(camera.source());
        assert!(wait_for_frame(&mut puller).is_some());

        let mut port_puller = Puller::new(port as SharedSource);
        assert!(wait_for_frame(&mut port_puller).is_some());
    }

    #[test]
    fn test_lost_device_stops_producing_but_does_not_panic() {
        let camera = Camera::new(
            0,
            Box::new(CountingBackend {
                produced: 0,
                fail_after: Some(1),
            }),
        );
        let mut puller = Puller::new(camera.source());
        assert!(wait_for_frame(&mut puller).is_some());

        // Pump has exited; repeated pulls stay quiet rather than erroring.
        std::thread::sleep(Duration::from_millis(5));
        assert!(puller.pull().frame().is_none());
    }
}
