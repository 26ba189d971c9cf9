//! Capture coordinator
//!
//! Owns the capture state, the autofocus cycle and the camera. It reacts to one
//! message at a time on the coordinator thread; messages that do not apply to
//! the current state are ignored.

use std::time::Instant;

use tracing::{debug, info, trace};

use super::scheduler::{Delayed, Scheduler};
use super::state::{CaptureMode, CaptureState};
use crate::capture::CameraSession;
use crate::config::AutofocusSettings;
use crate::presentation::PresentationSink;
use crate::shared::{CoordinatorHandle, CoordinatorMessage, DecodeWorkerHandle};
use crate::vision::{FailureReason, RecognitionOutcome, RecognitionResult};

/// Whether the coordinator loop should keep running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FocusTrigger {
    Cycle,
    User,
}

pub struct CaptureCoordinator {
    state: CaptureState,
    mode: CaptureMode,
    /// Set while an autofocus cycle is running
    autofocus_cycle_active: bool,
    /// Bumped whenever outstanding focus passes become stale
    focus_generation: u64,
    camera: Box<dyn CameraSession>,
    decoder: DecodeWorkerHandle,
    sink: Box<dyn PresentationSink>,
    scheduler: Scheduler,
    autofocus: AutofocusSettings,
    handle: CoordinatorHandle,
    last_success: Option<RecognitionResult>,
}

impl CaptureCoordinator {
    pub fn new(
        mode: CaptureMode,
        camera: Box<dyn CameraSession>,
        decoder: DecodeWorkerHandle,
        sink: Box<dyn PresentationSink>,
        autofocus: AutofocusSettings,
        handle: CoordinatorHandle,
    ) -> Self {
        Self {
            state: CaptureState::initial(mode),
            mode,
            autofocus_cycle_active: false,
            focus_generation: 0,
            camera,
            decoder,
            sink,
            scheduler: Scheduler::new(),
            autofocus,
            handle,
            last_success: None,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn mode(&self) -> CaptureMode {
        self.mode
    }

    pub fn autofocus_cycle_active(&self) -> bool {
        self.autofocus_cycle_active
    }

    /// When the next delayed message is due
    pub fn next_deadline(&self) -> Option<Instant> {
        if self.state == CaptureState::Done {
            return None;
        }
        self.scheduler.next_deadline()
    }

    /// Start the preview and, in continuous mode, the recognition loop
    pub fn start(&mut self) {
        info!("Capture coordinator starting in {:?} mode", self.mode);
        self.camera.start_preview();
        self.sink.set_controls_visible(true);

        match self.mode {
            CaptureMode::Continuous => {
                self.ensure_autofocus_cycle();
                self.restart_and_decode();
            }
            CaptureMode::SingleShot => self.restart_preview(),
        }
    }

    pub fn handle(&mut self, msg: CoordinatorMessage) -> Flow {
        if self.state == CaptureState::Done {
            return self.handle_done(msg);
        }

        match msg {
            CoordinatorMessage::AutofocusComplete {
                success,
                generation,
            } => self.on_autofocus_complete(success, generation),
            CoordinatorMessage::UserRequestedAutofocusDone {
                success,
                generation,
            } => self.on_user_autofocus_done(success, generation),
            CoordinatorMessage::RestartPreview => self.restart_preview(),
            CoordinatorMessage::ContinuousDecodeSucceeded(result) => {
                self.on_continuous_result(RecognitionOutcome::Success(result))
            }
            CoordinatorMessage::ContinuousDecodeFailed(failure) => {
                self.on_continuous_result(RecognitionOutcome::Failure(failure))
            }
            CoordinatorMessage::SingleShotDecodeSucceeded(result) => {
                self.on_single_shot_result(RecognitionOutcome::Success(result))
            }
            CoordinatorMessage::SingleShotDecodeFailed(failure) => {
                self.on_single_shot_result(RecognitionOutcome::Failure(failure))
            }
            CoordinatorMessage::Shutter => self.on_shutter(),
            CoordinatorMessage::ToggleContinuous => self.toggle_continuous(),
            CoordinatorMessage::Pause => self.pause(),
            CoordinatorMessage::Resume => self.resume(),
            CoordinatorMessage::RequestFocus => {
                let delay = self.autofocus.user_focus_delay();
                self.scheduler.schedule(delay, Delayed::UserAutofocus);
            }
            CoordinatorMessage::StopDecoding => self.stop_decoding(),
            CoordinatorMessage::QueryState(reply) => {
                let _ = reply.send(self.state);
            }
            CoordinatorMessage::Shutdown { ack } => {
                self.shutdown();
                let _ = ack.send(());
                return Flow::Exit;
            }
        }
        Flow::Continue
    }

    fn handle_done(&mut self, msg: CoordinatorMessage) -> Flow {
        match msg {
            CoordinatorMessage::QueryState(reply) => {
                let _ = reply.send(CaptureState::Done);
                Flow::Continue
            }
            CoordinatorMessage::Shutdown { ack } => {
                let _ = ack.send(());
                Flow::Exit
            }
            other => {
                trace!("Ignoring {:?} after shutdown", other);
                Flow::Continue
            }
        }
    }

    /// Fire delayed messages that are due at `now`
    pub fn fire_due_timers(&mut self, now: Instant) {
        if self.state == CaptureState::Done {
            return;
        }
        for kind in self.scheduler.pop_due(now) {
            match kind {
                Delayed::Autofocus => self.request_autofocus(FocusTrigger::Cycle),
                Delayed::UserAutofocus => self.request_autofocus(FocusTrigger::User),
            }
        }
    }

    fn transition(&mut self, next: CaptureState) {
        if self.state != next {
            debug!("Capture state {} -> {}", self.state, next);
            self.state = next;
        }
    }

    // Autofocus

    fn on_autofocus_complete(&mut self, success: bool, generation: u64) {
        if generation != self.focus_generation {
            trace!("Dropping stale autofocus callback");
            return;
        }

        let interval = self.autofocus.interval(success);
        match self.state {
            CaptureState::Preview | CaptureState::PreviewFocusing => {
                self.transition(CaptureState::Preview);
                self.schedule_autofocus(interval);
            }
            CaptureState::Continuous | CaptureState::ContinuousFocusing => {
                self.transition(CaptureState::Continuous);
                self.schedule_autofocus(interval);
            }
            CaptureState::ContinuousWaitingForAutofocusToFinish => {
                self.transition(CaptureState::Continuous);
                self.schedule_autofocus(interval);
                self.restart_and_decode();
            }
            _ => {
                debug!("Autofocus cycle stopped in {}", self.state);
                self.autofocus_cycle_active = false;
            }
        }
    }

    fn on_user_autofocus_done(&mut self, success: bool, generation: u64) {
        if generation != self.focus_generation {
            trace!("Dropping stale user autofocus callback");
            return;
        }
        trace!("User autofocus finished (success: {})", success);

        match self.state {
            CaptureState::PreviewFocusing => self.transition(CaptureState::Preview),
            CaptureState::ContinuousFocusing
            | CaptureState::ContinuousWaitingForAutofocusToFinish => {
                self.transition(CaptureState::Continuous);
                self.restart_and_decode();
            }
            _ => {}
        }
    }

    fn ensure_autofocus_cycle(&mut self) {
        if !self.autofocus_cycle_active {
            self.autofocus_cycle_active = true;
            self.request_autofocus(FocusTrigger::Cycle);
        }
    }

    fn schedule_autofocus(&mut self, delay: std::time::Duration) {
        self.scheduler.cancel(Delayed::Autofocus);
        self.scheduler.schedule(delay, Delayed::Autofocus);
    }

    fn request_autofocus(&mut self, trigger: FocusTrigger) {
        let next = match self.state {
            CaptureState::Preview => CaptureState::PreviewFocusing,
            CaptureState::Continuous => CaptureState::ContinuousFocusing,
            state if state.is_focusing() => {
                // Busy with another pass, try again later
                if trigger == FocusTrigger::Cycle {
                    self.schedule_autofocus(self.autofocus.interval(false));
                }
                return;
            }
            _ => {
                if trigger == FocusTrigger::Cycle {
                    debug!("Autofocus cycle stopped in {}", self.state);
                    self.autofocus_cycle_active = false;
                }
                return;
            }
        };

        self.transition(next);
        let handle = self.handle.clone();
        let generation = self.focus_generation;
        self.camera.request_autofocus(Box::new(move |success| {
            let msg = match trigger {
                FocusTrigger::Cycle => CoordinatorMessage::AutofocusComplete {
                    success,
                    generation,
                },
                FocusTrigger::User => CoordinatorMessage::UserRequestedAutofocusDone {
                    success,
                    generation,
                },
            };
            if handle.post(msg).is_err() {
                trace!("Autofocus finished after session closed");
            }
        }));
    }

    /// Drop scheduled work and invalidate outstanding focus passes
    fn purge_autofocus(&mut self) {
        self.scheduler.clear();
        self.autofocus_cycle_active = false;
        self.focus_generation += 1;
    }

    // Preview and decode loop

    fn restart_preview(&mut self) {
        self.sink.set_controls_visible(true);

        if self.state == CaptureState::Success {
            self.transition(CaptureState::Preview);
            self.sink.draw_viewfinder();
            self.ensure_autofocus_cycle();
        }
    }

    fn restart_and_decode(&mut self) {
        self.camera.start_preview();
        let decoder = self.decoder.clone();
        self.camera
            .request_frame(Box::new(move |frame| decoder.continuous(frame)));
        self.sink.draw_viewfinder();
    }

    fn on_continuous_result(&mut self, outcome: RecognitionOutcome) {
        self.decoder.reset_pending();

        if self.mode != CaptureMode::Continuous {
            trace!("Dropping continuous result in single-shot mode");
            return;
        }

        self.last_success = match &outcome {
            RecognitionOutcome::Success(result) => Some(result.clone()),
            RecognitionOutcome::Failure(_) => None,
        };
        self.sink.on_continuous_result(outcome);

        match self.state {
            CaptureState::Continuous => self.restart_and_decode(),
            CaptureState::ContinuousFocusing => {
                self.transition(CaptureState::ContinuousWaitingForAutofocusToFinish)
            }
            _ => {}
        }
    }

    fn on_single_shot_result(&mut self, outcome: RecognitionOutcome) {
        if self.mode != CaptureMode::SingleShot {
            trace!("Dropping single-shot result in continuous mode");
            return;
        }

        match &outcome {
            RecognitionOutcome::Success(_) => self.transition(CaptureState::Success),
            RecognitionOutcome::Failure(failure) => {
                debug!("Single-shot recognition failed: {:?}", failure.reason);
                self.transition(CaptureState::Preview);
            }
        }
        self.sink.set_shutter_enabled(true);
        self.sink.on_single_shot_result(outcome);
    }

    // User controls

    fn on_shutter(&mut self) {
        match self.mode {
            CaptureMode::SingleShot => {
                if !matches!(
                    self.state,
                    CaptureState::Preview | CaptureState::PreviewFocusing
                ) {
                    trace!("Shutter ignored in {}", self.state);
                    return;
                }
                self.sink.set_shutter_enabled(false);
                self.transition(CaptureState::PreviewPaused);
                let decoder = self.decoder.clone();
                self.camera
                    .request_frame(Box::new(move |frame| decoder.single_shot(frame)));
            }
            CaptureMode::Continuous => self.pause_continuous(true),
        }
    }

    /// Freeze the continuous loop, optionally presenting the last result
    fn pause_continuous(&mut self, present: bool) {
        if !self.state.is_continuous_active() {
            trace!("Pause ignored in {}", self.state);
            return;
        }

        self.transition(CaptureState::ContinuousPaused);
        self.purge_autofocus();
        self.camera.stop_preview();

        if present {
            match self.last_success.clone() {
                Some(result) => self
                    .sink
                    .on_single_shot_result(RecognitionOutcome::Success(result)),
                None => {
                    debug!("No previous result to show, resuming");
                    let notice = RecognitionOutcome::failed(FailureReason::EmptyText, 0);
                    self.sink.on_single_shot_result(notice);
                    self.transition(CaptureState::Continuous);
                    self.ensure_autofocus_cycle();
                    self.restart_and_decode();
                }
            }
        }
    }

    fn pause(&mut self) {
        match self.mode {
            CaptureMode::Continuous => self.pause_continuous(false),
            CaptureMode::SingleShot => {
                self.purge_autofocus();
                if self.state == CaptureState::PreviewFocusing {
                    self.transition(CaptureState::Preview);
                }
            }
        }
    }

    fn resume(&mut self) {
        match (self.mode, self.state) {
            (CaptureMode::Continuous, CaptureState::ContinuousPaused) => {
                self.transition(CaptureState::Continuous);
                self.ensure_autofocus_cycle();
                self.restart_and_decode();
            }
            (CaptureMode::SingleShot, CaptureState::Preview) => self.ensure_autofocus_cycle(),
            (_, state) => trace!("Resume ignored in {}", state),
        }
    }

    fn stop_decoding(&mut self) {
        match self.mode {
            CaptureMode::Continuous => {
                debug!("Stopping continuous recognition");
                self.pause_continuous(false);
            }
            CaptureMode::SingleShot => trace!("Stop request ignored in single-shot mode"),
        }
    }

    fn toggle_continuous(&mut self) {
        self.purge_autofocus();
        self.camera.start_preview();

        match self.mode {
            CaptureMode::SingleShot => {
                info!("Switching to continuous capture");
                self.mode = CaptureMode::Continuous;
                self.sink.set_shutter_enabled(true);
                self.transition(CaptureState::Continuous);
                self.ensure_autofocus_cycle();
                self.restart_and_decode();
            }
            CaptureMode::Continuous => {
                info!("Switching to single-shot capture");
                self.mode = CaptureMode::SingleShot;
                self.last_success = None;
                self.transition(CaptureState::Success);
                self.restart_preview();
            }
        }
    }

    fn shutdown(&mut self) {
        info!("Capture coordinator shutting down");
        self.transition(CaptureState::Done);
        self.camera.stop_preview();
        self.camera.close();
        self.purge_autofocus();
        self.decoder.quit();
    }
}
