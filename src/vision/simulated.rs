//! Simulated recognition engine for demos
//!
//! Sleeps for a fixed latency and reports a fixed text. Useful for exercising
//! the capture pipeline without a real OCR backend.

use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use image::GrayImage;
use tracing::debug;

use super::ocr::{EngineOutput, RecognitionEngine, TextBox};
use crate::error::EngineFault;

/// Fixed-answer engine with configurable latency
pub struct SimulatedEngine {
    text: String,
    confidence: i32,
    latency: Duration,
    /// Fault on every n-th call (0 = never)
    fault_every: u64,
    calls: AtomicU64,
}

impl SimulatedEngine {
    pub fn new(text: impl Into<String>, confidence: i32, latency: Duration) -> Self {
        Self {
            text: text.into(),
            confidence,
            latency,
            fault_every: 0,
            calls: AtomicU64::new(0),
        }
    }

    /// Raise a fault on every n-th call
    pub fn with_fault_every(mut self, n: u64) -> Self {
        self.fault_every = n;
        self
    }
}

impl RecognitionEngine for SimulatedEngine {
    fn recognize(&self, image: &GrayImage) -> Result<EngineOutput, EngineFault> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        thread::sleep(self.latency);

        if self.fault_every > 0 && call % self.fault_every == 0 {
            return Err(EngineFault::new(format!("simulated fault on call {}", call)));
        }

        let (width, height) = image.dimensions();
        let words: Vec<&str> = self.text.split_whitespace().collect();
        let word_width = width / words.len().max(1) as u32;

        Ok(EngineOutput {
            text: Some(self.text.clone()),
            word_confidences: vec![self.confidence; words.len()],
            mean_confidence: self.confidence,
            character_boxes: Vec::new(),
            word_boxes: (0..words.len() as u32)
                .map(|i| TextBox::new(i * word_width, 0, word_width, height))
                .collect(),
            line_boxes: vec![TextBox::new(0, 0, width, height)],
        })
    }

    fn clear_state(&self) {
        debug!("Simulated engine state cleared");
    }
}
