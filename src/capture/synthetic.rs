//! Synthetic camera for demos and hardware-free runs
//!
//! Generates a luminance gradient frame after a fixed delay and completes
//! autofocus passes after another delay. Stopping the preview invalidates
//! every callback still waiting to fire.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info};

use super::{AutofocusCallback, CameraSession, Frame, FrameCallback, PixelFormat};
use crate::error::CameraError;

/// Synthetic camera settings
#[derive(Debug, Clone)]
pub struct SyntheticCameraConfig {
    /// Preview width in pixels
    pub width: u32,
    /// Preview height in pixels
    pub height: u32,
    /// Delay before a requested frame is delivered
    pub frame_delay: Duration,
    /// Duration of one autofocus pass
    pub focus_duration: Duration,
    /// Whether autofocus passes converge
    pub focus_succeeds: bool,
    /// Simulate a camera that cannot be opened
    pub unavailable: bool,
}

impl Default for SyntheticCameraConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            frame_delay: Duration::from_millis(33),
            focus_duration: Duration::from_millis(200),
            focus_succeeds: true,
            unavailable: false,
        }
    }
}

/// Camera session backed by background timer threads
pub struct SyntheticCamera {
    config: SyntheticCameraConfig,
    opened: bool,
    previewing: Arc<AtomicBool>,
    /// Bumped on every preview stop so stale callbacks can tell
    generation: Arc<AtomicU64>,
}

impl SyntheticCamera {
    pub fn new(config: SyntheticCameraConfig) -> Self {
        Self {
            config,
            opened: false,
            previewing: Arc::new(AtomicBool::new(false)),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    fn is_previewing(&self) -> bool {
        self.opened && self.previewing.load(Ordering::SeqCst)
    }

    /// Run `fire` after `delay` unless the preview was stopped in between
    fn fire_later<F>(&self, delay: Duration, fire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let previewing = Arc::clone(&self.previewing);
        let generation = Arc::clone(&self.generation);
        let armed_at = generation.load(Ordering::SeqCst);

        thread::spawn(move || {
            thread::sleep(delay);
            if previewing.load(Ordering::SeqCst) && generation.load(Ordering::SeqCst) == armed_at {
                fire();
            }
        });
    }
}

impl Default for SyntheticCamera {
    fn default() -> Self {
        Self::new(SyntheticCameraConfig::default())
    }
}

/// Build an NV21 frame with a horizontal luminance gradient
pub fn gradient_frame(width: u32, height: u32) -> Frame {
    let len = PixelFormat::Nv21.required_len(width, height);
    let mut data = vec![128u8; len];
    for y in 0..height as usize {
        for x in 0..width as usize {
            data[y * width as usize + x] = ((x * 255) / width.max(1) as usize) as u8;
        }
    }
    Frame::new(data, width, height, PixelFormat::Nv21)
}

impl CameraSession for SyntheticCamera {
    fn open(&mut self) -> Result<(), CameraError> {
        if self.config.unavailable {
            return Err(CameraError::Unavailable(
                "synthetic camera configured as unavailable".to_string(),
            ));
        }
        self.opened = true;
        info!(
            "Synthetic camera opened at {}x{}",
            self.config.width, self.config.height
        );
        Ok(())
    }

    fn close(&mut self) {
        self.stop_preview();
        self.opened = false;
        info!("Synthetic camera closed");
    }

    fn start_preview(&mut self) {
        if self.opened && !self.previewing.swap(true, Ordering::SeqCst) {
            debug!("Synthetic preview started");
        }
    }

    fn stop_preview(&mut self) {
        if self.previewing.swap(false, Ordering::SeqCst) {
            self.generation.fetch_add(1, Ordering::SeqCst);
            debug!("Synthetic preview stopped");
        }
    }

    fn request_frame(&mut self, on_frame: FrameCallback) {
        if !self.is_previewing() {
            return;
        }
        let (width, height) = (self.config.width, self.config.height);
        self.fire_later(self.config.frame_delay, move || {
            on_frame(gradient_frame(width, height));
        });
    }

    fn request_autofocus(&mut self, on_complete: AutofocusCallback) {
        if !self.is_previewing() {
            return;
        }
        let success = self.config.focus_succeeds;
        self.fire_later(self.config.focus_duration, move || on_complete(success));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    fn fast_config() -> SyntheticCameraConfig {
        SyntheticCameraConfig {
            width: 32,
            height: 16,
            frame_delay: Duration::from_millis(5),
            focus_duration: Duration::from_millis(5),
            ..Default::default()
        }
    }

    #[test]
    fn test_open_unavailable() {
        let mut camera = SyntheticCamera::new(SyntheticCameraConfig {
            unavailable: true,
            ..Default::default()
        });
        assert!(matches!(camera.open(), Err(CameraError::Unavailable(_))));
    }

    #[test]
    fn test_frame_delivered_while_previewing() {
        let mut camera = SyntheticCamera::new(fast_config());
        camera.open().unwrap();
        camera.start_preview();

        let (tx, rx) = bounded(1);
        camera.request_frame(Box::new(move |frame| {
            let _ = tx.send(frame.dimensions());
        }));

        assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), (32, 16));
    }

    #[test]
    fn test_no_frame_without_preview() {
        let mut camera = SyntheticCamera::new(fast_config());
        camera.open().unwrap();

        let (tx, rx) = bounded(1);
        camera.request_frame(Box::new(move |frame| {
            let _ = tx.send(frame.dimensions());
        }));

        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[test]
    fn test_stop_preview_drops_pending_autofocus() {
        let mut camera = SyntheticCamera::new(SyntheticCameraConfig {
            focus_duration: Duration::from_millis(100),
            ..fast_config()
        });
        camera.open().unwrap();
        camera.start_preview();

        let (tx, rx) = bounded(1);
        camera.request_autofocus(Box::new(move |ok| {
            let _ = tx.send(ok);
        }));
        camera.stop_preview();
        camera.start_preview();

        assert!(rx.recv_timeout(Duration::from_millis(300)).is_err());
    }

    #[test]
    fn test_gradient_frame_is_valid() {
        let frame = gradient_frame(10, 4);
        assert!(frame.validate().is_ok());
        assert_eq!(frame.data[0], 0);
        assert!(frame.data[9] > frame.data[1]);
    }
}
