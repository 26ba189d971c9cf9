//! Presentation Layer
//!
//! The sink receives results and control updates from the capture
//! coordinator. All sink calls happen on the coordinator thread, one at a time.

pub mod console;
pub mod cue;

pub use console::ConsoleSink;
pub use cue::{BellCue, ShutterCue, SilentCue};

use std::fmt;

use serde::Serialize;

use crate::vision::RecognitionOutcome;

/// Session-level failures shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionErrorKind {
    /// The camera could not be opened or connected
    HardwareUnavailable,
    /// Background workers could not be started
    Internal,
}

impl fmt::Display for SessionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionErrorKind::HardwareUnavailable => write!(f, "hardware unavailable"),
            SessionErrorKind::Internal => write!(f, "internal error"),
        }
    }
}

/// Receives recognition results for rendering
pub trait PresentationSink: Send {
    /// Result of a user-triggered recognition
    fn on_single_shot_result(&mut self, outcome: RecognitionOutcome);

    /// Result of one pass of the continuous loop
    fn on_continuous_result(&mut self, outcome: RecognitionOutcome);

    /// A fatal session error
    fn on_session_error(&mut self, kind: SessionErrorKind, message: &str);

    fn set_controls_visible(&mut self, visible: bool);

    fn set_shutter_enabled(&mut self, enabled: bool);

    /// Redraw the capture overlay (framing rectangle)
    fn draw_viewfinder(&mut self) {}
}
