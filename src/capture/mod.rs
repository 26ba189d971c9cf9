//! Camera Capture Layer
//!
//! The camera driver is an external collaborator. The pipeline only needs a
//! preview that can be started and stopped, one-shot frame delivery and
//! autofocus on demand; everything else stays behind this trait.

pub mod frame;
pub mod synthetic;

pub use frame::{Frame, PixelFormat};
pub use synthetic::SyntheticCamera;

use crate::error::CameraError;

/// Receives exactly one preview frame
pub type FrameCallback = Box<dyn FnOnce(Frame) + Send + 'static>;

/// Receives the outcome of one autofocus pass
pub type AutofocusCallback = Box<dyn FnOnce(bool) + Send + 'static>;

/// Hardware camera owned by a capture session
///
/// Only the capture coordinator calls into this trait. Callbacks may be
/// invoked from any thread; implementations drop pending callbacks when the
/// preview is stopped.
pub trait CameraSession: Send {
    /// Open the camera driver
    fn open(&mut self) -> Result<(), CameraError>;

    /// Release the camera driver
    fn close(&mut self);

    /// Begin drawing preview frames. No-op if already previewing.
    fn start_preview(&mut self);

    /// Stop drawing preview frames. No-op if not previewing.
    fn stop_preview(&mut self);

    /// Deliver at most one preview frame to `on_frame`
    fn request_frame(&mut self, on_frame: FrameCallback);

    /// Run one autofocus pass and report whether it converged
    fn request_autofocus(&mut self, on_complete: AutofocusCallback);
}
