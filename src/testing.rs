//! Test doubles for the capture pipeline

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};
use image::GrayImage;
use parking_lot::Mutex;

use crate::capture::{AutofocusCallback, CameraSession, Frame, FrameCallback};
use crate::error::{CameraError, EngineFault};
use crate::presentation::{PresentationSink, SessionErrorKind, ShutterCue};
use crate::vision::{EngineOutput, RecognitionEngine, RecognitionOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraCall {
    Open,
    Close,
    StartPreview,
    StopPreview,
    RequestFrame,
    RequestAutofocus,
}

#[derive(Default)]
struct ManualCameraInner {
    calls: Vec<CameraCall>,
    frames: VecDeque<FrameCallback>,
    autofocus: VecDeque<AutofocusCallback>,
}

/// Camera whose callbacks fire only when the test says so
pub struct ManualCamera {
    inner: Arc<Mutex<ManualCameraInner>>,
    fail_open: bool,
}

/// Test-side handle to a [`ManualCamera`]
#[derive(Clone)]
pub struct ManualCameraControl {
    inner: Arc<Mutex<ManualCameraInner>>,
}

impl ManualCamera {
    pub fn new() -> (Self, ManualCameraControl) {
        let inner = Arc::new(Mutex::new(ManualCameraInner::default()));
        let control = ManualCameraControl {
            inner: Arc::clone(&inner),
        };
        (
            Self {
                inner,
                fail_open: false,
            },
            control,
        )
    }

    /// A camera that cannot be opened
    pub fn failing() -> (Self, ManualCameraControl) {
        let (mut camera, control) = Self::new();
        camera.fail_open = true;
        (camera, control)
    }

    fn record(&self, call: CameraCall) {
        self.inner.lock().calls.push(call);
    }
}

impl CameraSession for ManualCamera {
    fn open(&mut self) -> Result<(), CameraError> {
        self.record(CameraCall::Open);
        if self.fail_open {
            return Err(CameraError::Unavailable("camera in use".into()));
        }
        Ok(())
    }

    fn close(&mut self) {
        self.record(CameraCall::Close);
    }

    fn start_preview(&mut self) {
        self.record(CameraCall::StartPreview);
    }

    fn stop_preview(&mut self) {
        self.record(CameraCall::StopPreview);
    }

    fn request_frame(&mut self, on_frame: FrameCallback) {
        let mut inner = self.inner.lock();
        inner.calls.push(CameraCall::RequestFrame);
        inner.frames.push_back(on_frame);
    }

    fn request_autofocus(&mut self, on_complete: AutofocusCallback) {
        let mut inner = self.inner.lock();
        inner.calls.push(CameraCall::RequestAutofocus);
        inner.autofocus.push_back(on_complete);
    }
}

impl ManualCameraControl {
    pub fn calls(&self) -> Vec<CameraCall> {
        self.inner.lock().calls.clone()
    }

    pub fn pending_frames(&self) -> usize {
        self.inner.lock().frames.len()
    }

    pub fn pending_autofocus(&self) -> usize {
        self.inner.lock().autofocus.len()
    }

    /// Deliver a frame to the oldest waiting callback
    pub fn deliver_frame(&self, frame: Frame) -> bool {
        // release the lock before running the callback
        let callback = self.inner.lock().frames.pop_front();
        match callback {
            Some(callback) => {
                callback(frame);
                true
            }
            None => false,
        }
    }

    /// Complete the oldest autofocus request
    pub fn complete_autofocus(&self, success: bool) -> bool {
        let callback = self.inner.lock().autofocus.pop_front();
        match callback {
            Some(callback) => {
                callback(success);
                true
            }
            None => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    SingleShot(RecognitionOutcome),
    Continuous(RecognitionOutcome),
    SessionError(SessionErrorKind, String),
    ControlsVisible(bool),
    ShutterEnabled(bool),
    Viewfinder,
}

/// Sink that records every call
#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<SinkEvent>>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().clone()
    }

    pub fn single_shot_results(&self) -> Vec<RecognitionOutcome> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                SinkEvent::SingleShot(outcome) => Some(outcome.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn continuous_results(&self) -> Vec<RecognitionOutcome> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Continuous(outcome) => Some(outcome.clone()),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: SinkEvent) {
        self.events.lock().push(event);
    }
}

impl PresentationSink for RecordingSink {
    fn on_single_shot_result(&mut self, outcome: RecognitionOutcome) {
        self.push(SinkEvent::SingleShot(outcome));
    }

    fn on_continuous_result(&mut self, outcome: RecognitionOutcome) {
        self.push(SinkEvent::Continuous(outcome));
    }

    fn on_session_error(&mut self, kind: SessionErrorKind, message: &str) {
        self.push(SinkEvent::SessionError(kind, message.to_string()));
    }

    fn set_controls_visible(&mut self, visible: bool) {
        self.push(SinkEvent::ControlsVisible(visible));
    }

    fn set_shutter_enabled(&mut self, enabled: bool) {
        self.push(SinkEvent::ShutterEnabled(enabled));
    }

    fn draw_viewfinder(&mut self) {
        self.push(SinkEvent::Viewfinder);
    }
}

/// Cue that counts how often it was played
#[derive(Clone, Default)]
pub struct CountingCue {
    plays: Arc<AtomicUsize>,
}

impl CountingCue {
    pub fn plays(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }
}

impl ShutterCue for CountingCue {
    fn play(&self) {
        self.plays.fetch_add(1, Ordering::SeqCst);
    }
}

enum Scripted {
    Output(Result<EngineOutput, EngineFault>),
    Panic(String),
}

/// Engine answering from a script, optionally blocking until released
pub struct ScriptedEngine {
    script: Mutex<VecDeque<Scripted>>,
    fallback: EngineOutput,
    gate: Option<(Sender<()>, Receiver<()>)>,
    started: (Sender<()>, Receiver<()>),
    calls: AtomicUsize,
    clears: AtomicUsize,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: EngineOutput::text("TEXT", 70),
            gate: None,
            started: unbounded(),
            calls: AtomicUsize::new(0),
            clears: AtomicUsize::new(0),
        }
    }

    /// Every call blocks until [`ScriptedEngine::release`]
    pub fn gated() -> Self {
        Self {
            gate: Some(unbounded()),
            ..Self::new()
        }
    }

    pub fn push(&self, output: Result<EngineOutput, EngineFault>) {
        self.script.lock().push_back(Scripted::Output(output));
    }

    pub fn push_panic(&self, message: &str) {
        self.script
            .lock()
            .push_back(Scripted::Panic(message.to_string()));
    }

    /// Let one blocked call finish
    pub fn release(&self) {
        if let Some((tx, _)) = &self.gate {
            let _ = tx.send(());
        }
    }

    /// Wait until a call has entered the engine
    pub fn wait_started(&self, timeout: Duration) -> bool {
        self.started.1.recv_timeout(timeout).is_ok()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

impl RecognitionEngine for ScriptedEngine {
    fn recognize(&self, _image: &GrayImage) -> Result<EngineOutput, EngineFault> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let _ = self.started.0.send(());

        if let Some((_, rx)) = &self.gate {
            let _ = rx.recv_timeout(Duration::from_secs(10));
        }

        let next = self.script.lock().pop_front();
        match next {
            Some(Scripted::Output(output)) => output,
            Some(Scripted::Panic(message)) => panic!("{}", message),
            None => Ok(self.fallback.clone()),
        }
    }

    fn clear_state(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
    }
}

/// Poll `condition` until it holds or `timeout` passes
pub fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}
