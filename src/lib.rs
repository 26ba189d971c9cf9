//! ocr-capture - Live camera capture coordination for text recognition
//!
//! Drives a camera preview, cycles autofocus, throttles recognition requests
//! against a slow engine and routes results back to a presentation layer.
//! The coordinator, the decode worker and the recognition pool talk to each
//! other only through mailboxes.

pub mod app;
pub mod capture;
pub mod config;
pub mod error;
pub mod presentation;
pub mod session;
pub mod shared;
pub mod vision;

#[cfg(test)]
pub(crate) mod testing;

pub use app::{CaptureApp, DemoOptions};
pub use capture::{CameraSession, Frame, PixelFormat};
pub use config::AppConfig;
pub use error::{CameraError, EngineFault, FrameError, SessionError};
pub use presentation::{PresentationSink, SessionErrorKind};
pub use session::{CaptureSession, CaptureState, Collaborators, TeardownStatus};
pub use vision::{RecognitionEngine, RecognitionOutcome};
