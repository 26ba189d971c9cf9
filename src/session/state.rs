//! Capture state machine states

use std::fmt;

/// Current state of the capture coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureState {
    Preview,
    PreviewFocusing,
    /// Waiting for a single-shot recognition
    PreviewPaused,
    Continuous,
    ContinuousFocusing,
    /// A continuous result arrived mid-focus; the loop resumes once focus completes
    ContinuousWaitingForAutofocusToFinish,
    ContinuousPaused,
    /// A single-shot result is on screen
    Success,
    /// Terminal
    Done,
}

impl CaptureState {
    /// Initial state for the given mode
    pub fn initial(mode: CaptureMode) -> Self {
        match mode {
            CaptureMode::SingleShot => CaptureState::Success,
            CaptureMode::Continuous => CaptureState::Continuous,
        }
    }

    /// Running the continuous loop (not paused)
    pub fn is_continuous_active(self) -> bool {
        matches!(
            self,
            CaptureState::Continuous
                | CaptureState::ContinuousFocusing
                | CaptureState::ContinuousWaitingForAutofocusToFinish
        )
    }

    /// An autofocus pass is in progress or awaited
    pub fn is_focusing(self) -> bool {
        matches!(
            self,
            CaptureState::PreviewFocusing
                | CaptureState::ContinuousFocusing
                | CaptureState::ContinuousWaitingForAutofocusToFinish
        )
    }
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CaptureState::Preview => "PREVIEW",
            CaptureState::PreviewFocusing => "PREVIEW_FOCUSING",
            CaptureState::PreviewPaused => "PREVIEW_PAUSED",
            CaptureState::Continuous => "CONTINUOUS",
            CaptureState::ContinuousFocusing => "CONTINUOUS_FOCUSING",
            CaptureState::ContinuousWaitingForAutofocusToFinish => {
                "CONTINUOUS_WAITING_FOR_AUTOFOCUS_TO_FINISH"
            }
            CaptureState::ContinuousPaused => "CONTINUOUS_PAUSED",
            CaptureState::Success => "SUCCESS",
            CaptureState::Done => "DONE",
        };
        f.write_str(name)
    }
}

/// Capture mode chosen when the session opens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureMode {
    #[default]
    SingleShot,
    Continuous,
}

impl CaptureMode {
    pub fn from_continuous(continuous: bool) -> Self {
        if continuous {
            CaptureMode::Continuous
        } else {
            CaptureMode::SingleShot
        }
    }
}
