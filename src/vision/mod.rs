//! Vision/OCR Layer
//!
//! Turns preview frames into grayscale images, hands them to a recognition
//! engine and applies the acceptance rules to what comes back.

pub mod ocr;
pub mod outcome;
pub mod preprocess;
pub mod simulated;

pub use ocr::{EngineOutput, RecognitionEngine, TextBox};
pub use outcome::{FailureReason, RecognitionFailure, RecognitionOutcome, RecognitionResult};
pub use preprocess::{preprocess_for_recognition, FramingRect, PreprocessConfig};
pub use simulated::SimulatedEngine;
