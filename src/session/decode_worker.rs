//! Decode worker
//!
//! Runs its own receive loop on a dedicated thread. Converts frames to
//! grayscale crops and dispatches recognition tasks, allowing at most one
//! continuous recognition in flight.

use std::sync::Arc;

use crossbeam_channel::Receiver;
use tracing::{debug, info, trace, warn};

use super::recognition::{PoolStats, RecognitionPool, RecognitionTask};
use crate::capture::Frame;
use crate::config::RecognitionSettings;
use crate::presentation::ShutterCue;
use crate::shared::{CoordinatorHandle, CoordinatorMessage, DecodeMessage, DecodeMode};
use crate::vision::{
    preprocess_for_recognition, FailureReason, PreprocessConfig, RecognitionEngine,
    RecognitionOutcome,
};

pub struct DecodeWorker {
    rx: Receiver<DecodeMessage>,
    /// Set while a continuous recognition is outstanding
    pending: bool,
    preprocess: PreprocessConfig,
    pool: RecognitionPool,
    engine: Arc<dyn RecognitionEngine>,
    cue: Option<Box<dyn ShutterCue>>,
    settings: RecognitionSettings,
    coordinator: CoordinatorHandle,
}

impl DecodeWorker {
    pub fn new(
        rx: Receiver<DecodeMessage>,
        preprocess: PreprocessConfig,
        pool: RecognitionPool,
        engine: Arc<dyn RecognitionEngine>,
        cue: Option<Box<dyn ShutterCue>>,
        settings: RecognitionSettings,
        coordinator: CoordinatorHandle,
    ) -> Self {
        Self {
            rx,
            pending: false,
            preprocess,
            pool,
            engine,
            cue,
            settings,
            coordinator,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn stats(&self) -> Arc<PoolStats> {
        self.pool.stats()
    }

    /// Receive until quit or until every sender is gone
    pub fn run(mut self) {
        info!("Decode worker starting...");
        while let Ok(msg) = self.rx.recv() {
            if !self.handle(msg) {
                break;
            }
        }
        self.pool.shutdown();
        info!("Decode worker stopped");
    }

    /// Process one message. Returns false on quit.
    pub fn handle(&mut self, msg: DecodeMessage) -> bool {
        match msg {
            DecodeMessage::Continuous(frame) => {
                if self.pending {
                    trace!("Recognition pending, dropping continuous frame");
                    return true;
                }
                self.pending = true;
                self.dispatch(frame, DecodeMode::Continuous);
            }
            DecodeMessage::SingleShot(frame) => {
                if let Some(cue) = &self.cue {
                    cue.play();
                }
                self.dispatch(frame, DecodeMode::SingleShot);
            }
            DecodeMessage::ResetPending => {
                self.pending = false;
            }
            DecodeMessage::Quit => {
                debug!("Decode worker received quit");
                return false;
            }
        }
        true
    }

    fn dispatch(&self, frame: Frame, mode: DecodeMode) {
        let image = match preprocess_for_recognition(&frame, &self.preprocess) {
            Ok(image) => image,
            Err(e) => {
                warn!("Dropping unusable frame: {}", e);
                let outcome = RecognitionOutcome::failed(
                    FailureReason::InvalidFrame {
                        message: e.to_string(),
                    },
                    0,
                );
                if self
                    .coordinator
                    .post(CoordinatorMessage::decode_result(mode, outcome))
                    .is_err()
                {
                    self.coordinator.request_stop();
                }
                return;
            }
        };

        self.pool.spawn(RecognitionTask {
            image,
            mode,
            engine: Arc::clone(&self.engine),
            min_mean_confidence: self.settings.min_mean_confidence,
            clear_after_continuous: self.settings.clear_after_continuous,
            coordinator: self.coordinator.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{synthetic::gradient_frame, PixelFormat};
    use crate::config::CaptureSettings;
    use crate::testing::{CountingCue, ScriptedEngine};
    use crate::vision::EngineOutput;
    use crossbeam_channel::unbounded;
    use std::time::Duration;

    struct Fixture {
        worker: DecodeWorker,
        engine: Arc<ScriptedEngine>,
        cue: CountingCue,
        results: Receiver<CoordinatorMessage>,
    }

    fn fixture(engine: ScriptedEngine) -> Fixture {
        let engine = Arc::new(engine);
        let cue = CountingCue::default();
        let (_decode_tx, decode_rx) = unbounded();
        let (tx, results) = unbounded();
        let worker = DecodeWorker::new(
            decode_rx,
            PreprocessConfig::from(&CaptureSettings::default()),
            RecognitionPool::new(2).unwrap(),
            engine.clone(),
            Some(Box::new(cue.clone())),
            RecognitionSettings::default(),
            CoordinatorHandle::new(tx),
        );
        Fixture {
            worker,
            engine,
            cue,
            results,
        }
    }

    fn recv(results: &Receiver<CoordinatorMessage>) -> CoordinatorMessage {
        results.recv_timeout(Duration::from_secs(2)).unwrap()
    }

    #[test]
    fn test_second_continuous_frame_dropped_while_pending() {
        let mut f = fixture(ScriptedEngine::gated());
        f.engine.push(Ok(EngineOutput::text("FIRST", 70)));

        assert!(f.worker.handle(DecodeMessage::Continuous(gradient_frame(320, 240))));
        assert!(f.worker.handle(DecodeMessage::Continuous(gradient_frame(320, 240))));
        assert!(f.worker.is_pending());
        assert!(f.engine.wait_started(Duration::from_secs(2)));

        f.engine.release();
        assert!(matches!(
            recv(&f.results),
            CoordinatorMessage::ContinuousDecodeSucceeded(_)
        ));
        assert_eq!(f.worker.stats().dispatched(), 1);
        assert_eq!(f.engine.calls(), 1);
        // still pending until the coordinator says otherwise
        assert!(f.worker.is_pending());
    }

    #[test]
    fn test_reset_pending_allows_next_frame() {
        let mut f = fixture(ScriptedEngine::new());

        f.worker.handle(DecodeMessage::Continuous(gradient_frame(320, 240)));
        recv(&f.results);
        f.worker.handle(DecodeMessage::ResetPending);
        assert!(!f.worker.is_pending());

        f.worker.handle(DecodeMessage::Continuous(gradient_frame(320, 240)));
        recv(&f.results);
        assert_eq!(f.worker.stats().dispatched(), 2);
        assert_eq!(f.worker.stats().continuous_peak(), 1);
    }

    #[test]
    fn test_single_shot_always_dispatches_with_cue() {
        let mut f = fixture(ScriptedEngine::new());
        f.engine.push(Ok(EngineOutput::text("ONE", 70)));
        f.engine.push(Ok(EngineOutput::text("TWO", 70)));

        f.worker.handle(DecodeMessage::SingleShot(gradient_frame(320, 240)));
        f.worker.handle(DecodeMessage::SingleShot(gradient_frame(320, 240)));

        for _ in 0..2 {
            assert!(matches!(
                recv(&f.results),
                CoordinatorMessage::SingleShotDecodeSucceeded(_)
            ));
        }
        assert_eq!(f.cue.plays(), 2);
        assert!(!f.worker.is_pending());
    }

    #[test]
    fn test_invalid_frame_resolves_as_failure() {
        let mut f = fixture(ScriptedEngine::new());
        let short = Frame::new(vec![0; 10], 320, 240, PixelFormat::Gray8);

        f.worker.handle(DecodeMessage::Continuous(short));

        match recv(&f.results) {
            CoordinatorMessage::ContinuousDecodeFailed(failure) => {
                assert!(matches!(failure.reason, FailureReason::InvalidFrame { .. }));
            }
            other => panic!("unexpected message {:?}", other),
        }
        assert_eq!(f.engine.calls(), 0);
        assert!(f.worker.is_pending());
    }

    #[test]
    fn test_quit_stops_loop() {
        let mut f = fixture(ScriptedEngine::new());
        assert!(!f.worker.handle(DecodeMessage::Quit));
    }
}
