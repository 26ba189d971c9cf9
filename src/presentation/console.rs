//! Console sink printing results as JSON lines

use std::io::Write;

use serde::Serialize;
use tracing::{debug, error, warn};

use super::{PresentationSink, SessionErrorKind};
use crate::vision::RecognitionOutcome;

/// One line of console output
#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum ConsoleEvent<'a> {
    SingleShot { result: &'a RecognitionOutcome },
    Continuous { result: &'a RecognitionOutcome },
    SessionError { kind: SessionErrorKind, message: &'a str },
}

/// Writes every result to stdout
#[derive(Debug, Default)]
pub struct ConsoleSink {
    results_printed: usize,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of result lines written so far
    pub fn results_printed(&self) -> usize {
        self.results_printed
    }

    fn emit(&mut self, event: &ConsoleEvent<'_>) {
        match serde_json::to_string(event) {
            Ok(line) => {
                let mut stdout = std::io::stdout().lock();
                if let Err(e) = writeln!(stdout, "{}", line) {
                    warn!("Failed to write result line: {}", e);
                    return;
                }
                self.results_printed += 1;
            }
            Err(e) => warn!("Failed to serialize result: {}", e),
        }
    }
}

impl PresentationSink for ConsoleSink {
    fn on_single_shot_result(&mut self, outcome: RecognitionOutcome) {
        if !outcome.is_success() {
            warn!("Recognition failed. Please try again.");
        }
        self.emit(&ConsoleEvent::SingleShot { result: &outcome });
    }

    fn on_continuous_result(&mut self, outcome: RecognitionOutcome) {
        self.emit(&ConsoleEvent::Continuous { result: &outcome });
    }

    fn on_session_error(&mut self, kind: SessionErrorKind, message: &str) {
        error!("Session error ({}): {}", kind, message);
        self.emit(&ConsoleEvent::SessionError { kind, message });
    }

    fn set_controls_visible(&mut self, visible: bool) {
        debug!("Controls visible: {}", visible);
    }

    fn set_shutter_enabled(&mut self, enabled: bool) {
        debug!("Shutter enabled: {}", enabled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::{EngineOutput, FailureReason};

    #[test]
    fn test_event_json_shape() {
        let outcome = RecognitionOutcome::from_engine(EngineOutput::text("HELLO", 82), 40, 0);
        let line = serde_json::to_value(ConsoleEvent::SingleShot { result: &outcome }).unwrap();

        assert_eq!(line["event"], "single_shot");
        assert_eq!(line["result"]["outcome"], "success");
        assert_eq!(line["result"]["text"], "HELLO");
        assert_eq!(line["result"]["mean_confidence"], 82);
    }

    #[test]
    fn test_counts_printed_results() {
        let mut sink = ConsoleSink::new();
        sink.on_continuous_result(RecognitionOutcome::failed(FailureReason::EmptyText, 3));
        sink.on_session_error(SessionErrorKind::HardwareUnavailable, "no camera");
        assert_eq!(sink.results_printed(), 2);
    }
}
