//! Message types for communication between the coordinator and the decode worker

use crossbeam_channel::Sender;
use tracing::{debug, trace};

use crate::capture::Frame;
use crate::session::CaptureState;
use crate::vision::{RecognitionFailure, RecognitionOutcome, RecognitionResult};

/// Messages processed by the capture coordinator
#[derive(Debug)]
pub enum CoordinatorMessage {
    /// Camera finished a cycle-triggered focus pass.
    ///
    /// `generation` is the coordinator's focus generation when the pass was
    /// requested; callbacks from an older generation are stale.
    AutofocusComplete { success: bool, generation: u64 },
    /// Camera finished a user-requested focus pass
    UserRequestedAutofocusDone { success: bool, generation: u64 },
    /// Show the preview again after a single-shot result
    RestartPreview,
    ContinuousDecodeSucceeded(RecognitionResult),
    ContinuousDecodeFailed(RecognitionFailure),
    SingleShotDecodeSucceeded(RecognitionResult),
    SingleShotDecodeFailed(RecognitionFailure),
    /// User pressed the shutter
    Shutter,
    /// User toggled continuous capture on or off
    ToggleContinuous,
    Pause,
    Resume,
    /// User asked for a focus pass
    RequestFocus,
    /// Stop hook raised when recognition cannot continue
    StopDecoding,
    /// Reply with the current state
    QueryState(Sender<CaptureState>),
    /// Stop everything and acknowledge once the camera is released
    Shutdown { ack: Sender<()> },
}

impl CoordinatorMessage {
    /// Build the result message for a finished recognition
    pub fn decode_result(mode: DecodeMode, outcome: RecognitionOutcome) -> Self {
        match (mode, outcome) {
            (DecodeMode::Continuous, RecognitionOutcome::Success(r)) => {
                Self::ContinuousDecodeSucceeded(r)
            }
            (DecodeMode::Continuous, RecognitionOutcome::Failure(f)) => {
                Self::ContinuousDecodeFailed(f)
            }
            (DecodeMode::SingleShot, RecognitionOutcome::Success(r)) => {
                Self::SingleShotDecodeSucceeded(r)
            }
            (DecodeMode::SingleShot, RecognitionOutcome::Failure(f)) => {
                Self::SingleShotDecodeFailed(f)
            }
        }
    }
}

/// Messages processed by the decode worker
#[derive(Debug)]
pub enum DecodeMessage {
    Continuous(Frame),
    SingleShot(Frame),
    /// Clear the pending-decode flag
    ResetPending,
    Quit,
}

/// Which path a recognition was started from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeMode {
    SingleShot,
    Continuous,
}

/// The coordinator's mailbox has been closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("capture session is closed")]
pub struct SessionClosed;

/// Cloneable sender into the coordinator's mailbox
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    tx: Sender<CoordinatorMessage>,
}

impl CoordinatorHandle {
    pub fn new(tx: Sender<CoordinatorMessage>) -> Self {
        Self { tx }
    }

    pub fn post(&self, msg: CoordinatorMessage) -> Result<(), SessionClosed> {
        self.tx.send(msg).map_err(|_| SessionClosed)
    }

    /// Ask the coordinator to stop decoding. No-op once the session is gone.
    pub fn request_stop(&self) {
        if self.post(CoordinatorMessage::StopDecoding).is_err() {
            debug!("Stop requested after session closed");
        }
    }
}

/// Sender into the decode worker's mailbox
#[derive(Debug, Clone)]
pub struct DecodeWorkerHandle {
    tx: Sender<DecodeMessage>,
}

impl DecodeWorkerHandle {
    pub fn new(tx: Sender<DecodeMessage>) -> Self {
        Self { tx }
    }

    pub fn continuous(&self, frame: Frame) {
        self.send(DecodeMessage::Continuous(frame));
    }

    pub fn single_shot(&self, frame: Frame) {
        self.send(DecodeMessage::SingleShot(frame));
    }

    pub fn reset_pending(&self) {
        self.send(DecodeMessage::ResetPending);
    }

    pub fn quit(&self) {
        self.send(DecodeMessage::Quit);
    }

    fn send(&self, msg: DecodeMessage) {
        if let Err(e) = self.tx.send(msg) {
            trace!("Decode worker gone, dropping {:?}", e.into_inner());
        }
    }
}
