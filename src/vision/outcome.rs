//! Recognition outcomes delivered to the presentation layer

use serde::Serialize;

use super::ocr::{EngineOutput, TextBox};

/// An accepted recognition. The text is never empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecognitionResult {
    text: String,
    word_confidences: Vec<i32>,
    mean_confidence: i32,
    character_boxes: Vec<TextBox>,
    word_boxes: Vec<TextBox>,
    line_boxes: Vec<TextBox>,
    elapsed_ms: u64,
}

impl RecognitionResult {
    /// Wrap engine output, or `None` if it carries no text
    pub fn new(output: EngineOutput, elapsed_ms: u64) -> Option<Self> {
        let text = output.text.filter(|t| !t.is_empty())?;
        Some(Self {
            text,
            word_confidences: output.word_confidences,
            mean_confidence: output.mean_confidence,
            character_boxes: output.character_boxes,
            word_boxes: output.word_boxes,
            line_boxes: output.line_boxes,
            elapsed_ms,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn word_confidences(&self) -> &[i32] {
        &self.word_confidences
    }

    pub fn mean_confidence(&self) -> i32 {
        self.mean_confidence
    }

    pub fn character_boxes(&self) -> &[TextBox] {
        &self.character_boxes
    }

    pub fn word_boxes(&self) -> &[TextBox] {
        &self.word_boxes
    }

    pub fn line_boxes(&self) -> &[TextBox] {
        &self.line_boxes
    }

    /// Time spent inside the engine call
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }
}

/// Why a recognition attempt was not accepted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// The engine raised a runtime fault
    EngineFault { message: String },
    /// The engine returned no text
    EmptyText,
    /// Mean confidence under the configured floor
    LowConfidence { mean: i32, minimum: i32 },
    /// The frame could not be converted
    InvalidFrame { message: String },
}

/// A rejected recognition attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecognitionFailure {
    pub elapsed_ms: u64,
    pub reason: FailureReason,
}

impl RecognitionFailure {
    pub fn new(reason: FailureReason, elapsed_ms: u64) -> Self {
        Self { elapsed_ms, reason }
    }
}

/// Result of one recognition attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RecognitionOutcome {
    Success(RecognitionResult),
    Failure(RecognitionFailure),
}

impl RecognitionOutcome {
    /// Apply the acceptance rules to raw engine output.
    ///
    /// Empty text fails, then a mean confidence strictly below
    /// `min_mean_confidence` fails. A floor of 0 accepts any score.
    pub fn from_engine(output: EngineOutput, elapsed_ms: u64, min_mean_confidence: i32) -> Self {
        let mean = output.mean_confidence;
        let Some(result) = RecognitionResult::new(output, elapsed_ms) else {
            return Self::failed(FailureReason::EmptyText, elapsed_ms);
        };

        if min_mean_confidence > 0 && mean < min_mean_confidence {
            return Self::failed(
                FailureReason::LowConfidence {
                    mean,
                    minimum: min_mean_confidence,
                },
                elapsed_ms,
            );
        }

        Self::Success(result)
    }

    pub fn failed(reason: FailureReason, elapsed_ms: u64) -> Self {
        Self::Failure(RecognitionFailure::new(reason, elapsed_ms))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn elapsed_ms(&self) -> u64 {
        match self {
            Self::Success(result) => result.elapsed_ms,
            Self::Failure(failure) => failure.elapsed_ms,
        }
    }
}
