//! OCR engine seam
//!
//! The recognition algorithm is opaque to the pipeline. Engines are called
//! from pool threads, never from the coordinator.

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::error::EngineFault;

/// Axis-aligned box in image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TextBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl TextBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Raw output of one engine call, before acceptance checks
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineOutput {
    /// Recognized text, `None` if the engine produced nothing
    pub text: Option<String>,
    /// Confidence per recognized word (0-100)
    pub word_confidences: Vec<i32>,
    /// Mean confidence over the whole image (0-100)
    pub mean_confidence: i32,
    pub character_boxes: Vec<TextBox>,
    pub word_boxes: Vec<TextBox>,
    pub line_boxes: Vec<TextBox>,
}

impl EngineOutput {
    /// Output with text and a mean confidence only
    pub fn text(text: impl Into<String>, mean_confidence: i32) -> Self {
        Self {
            text: Some(text.into()),
            mean_confidence,
            ..Default::default()
        }
    }
}

/// Image to text recognition engine
pub trait RecognitionEngine: Send + Sync {
    /// Recognize text in a grayscale image. May block for hundreds of milliseconds.
    fn recognize(&self, image: &GrayImage) -> Result<EngineOutput, EngineFault>;

    /// Best-effort reset of internal state after a fault or a finished pass
    fn clear_state(&self) {}
}
