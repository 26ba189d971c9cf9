//! Error types shared across the capture pipeline

use thiserror::Error;

/// Errors reported by a camera session
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    #[error("Could not open camera: {0}")]
    Unavailable(String),
    #[error("Camera disconnected")]
    Disconnected,
}

/// Runtime fault raised by the recognition engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Recognition engine fault: {message}")]
pub struct EngineFault {
    pub message: String,
}

impl EngineFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A frame whose buffer does not match its declared geometry
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("Frame buffer too short: expected at least {expected} bytes, got {actual}")]
    BufferTooShort { expected: usize, actual: usize },
    #[error("Frame has empty dimensions {width}x{height}")]
    EmptyDimensions { width: u32, height: u32 },
}

/// Errors that prevent a capture session from opening
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Camera hardware unavailable: {0}")]
    HardwareUnavailable(#[from] CameraError),
    #[error("Failed to spawn {what}: {source}")]
    Spawn {
        what: &'static str,
        #[source]
        source: std::io::Error,
    },
}
