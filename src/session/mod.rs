//! Capture Session
//!
//! Opens the camera, starts the coordinator and decode worker threads, and
//! exposes the owner-facing controls. Teardown waits a bounded time for both
//! actors; anything still running afterwards is abandoned.

pub mod coordinator;
pub mod decode_worker;
pub mod recognition;
pub mod scheduler;
pub mod state;


pub use coordinator::{CaptureCoordinator, Flow};
pub use decode_worker::DecodeWorker;
pub use recognition::{PoolStats, RecognitionPool, RecognitionTask};
pub use state::{CaptureMode, CaptureState};

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError};
use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::capture::CameraSession;
use crate::config::{AppConfig, SessionSettings};
use crate::error::SessionError;
use crate::presentation::{PresentationSink, SessionErrorKind, ShutterCue};
use crate::shared::{CoordinatorHandle, CoordinatorMessage, DecodeWorkerHandle};
use crate::vision::{PreprocessConfig, RecognitionEngine};

/// External collaborators handed to a session
pub struct Collaborators {
    pub camera: Box<dyn CameraSession>,
    pub engine: Arc<dyn RecognitionEngine>,
    pub sink: Box<dyn PresentationSink>,
    pub cue: Box<dyn ShutterCue>,
}

/// How teardown went
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownStatus {
    /// Both actors stopped within the timeout
    Clean,
    /// At least one actor was abandoned
    TimedOut,
}

/// A running capture session
pub struct CaptureSession {
    id: Uuid,
    coordinator: CoordinatorHandle,
    decoder: DecodeWorkerHandle,
    decoder_done: Receiver<()>,
    threads: Vec<JoinHandle<()>>,
    stats: Arc<PoolStats>,
    settings: SessionSettings,
    closed: bool,
}

impl CaptureSession {
    /// Open the camera and start the session.
    ///
    /// A camera that cannot be opened is reported to the sink as
    /// [`SessionErrorKind::HardwareUnavailable`] and returned as an error.
    pub fn open(config: &AppConfig, collaborators: Collaborators) -> Result<Self, SessionError> {
        let Collaborators {
            mut camera,
            engine,
            mut sink,
            cue,
        } = collaborators;

        let id = Uuid::new_v4();
        let span = info_span!("session", id = %id);
        let _guard = span.enter();

        if let Err(e) = camera.open() {
            error!("Failed to open camera: {}", e);
            sink.on_session_error(SessionErrorKind::HardwareUnavailable, &e.to_string());
            return Err(SessionError::HardwareUnavailable(e));
        }

        let pool = match RecognitionPool::new(config.recognition.pool_size) {
            Ok(pool) => pool,
            Err(e) => return Err(abort_open(camera, sink, "recognition pool", e)),
        };
        let stats = pool.stats();

        let (coordinator_tx, coordinator_rx) = unbounded();
        let (decode_tx, decode_rx) = unbounded();
        let handle = CoordinatorHandle::new(coordinator_tx);
        let decoder = DecodeWorkerHandle::new(decode_tx);

        let worker = DecodeWorker::new(
            decode_rx,
            PreprocessConfig::from(&config.capture),
            pool,
            engine,
            config.capture.beep.then_some(cue),
            config.recognition.clone(),
            handle.clone(),
        );

        let (done_tx, decoder_done) = bounded(1);
        let worker_span = span.clone();
        let decoder_thread = thread::Builder::new()
            .name("decode-worker".into())
            .spawn(move || {
                let _guard = worker_span.enter();
                worker.run();
                let _ = done_tx.send(());
            });
        let decoder_thread = match decoder_thread {
            Ok(thread) => thread,
            Err(e) => return Err(abort_open(camera, sink, "decode worker", e)),
        };

        // Coordinator is handed over after the spawn; a failed spawn keeps camera and sink
        let (start_tx, start_rx) = bounded::<CaptureCoordinator>(1);
        let coordinator_span = span.clone();
        let coordinator_thread = thread::Builder::new()
            .name("capture-coordinator".into())
            .spawn(move || {
                let _guard = coordinator_span.enter();
                if let Ok(coordinator) = start_rx.recv() {
                    run_coordinator(coordinator, coordinator_rx);
                }
            });
        let coordinator_thread = match coordinator_thread {
            Ok(thread) => thread,
            Err(e) => {
                decoder.quit();
                return Err(abort_open(camera, sink, "capture coordinator", e));
            }
        };

        let mode = CaptureMode::from_continuous(config.capture.continuous);
        let coordinator = CaptureCoordinator::new(
            mode,
            camera,
            decoder.clone(),
            sink,
            config.autofocus.clone(),
            handle.clone(),
        );
        if start_tx.send(coordinator).is_err() {
            error!("Capture coordinator thread exited before starting");
        }

        info!("Capture session opened in {:?} mode", mode);

        Ok(Self {
            id,
            coordinator: handle,
            decoder,
            decoder_done,
            threads: vec![coordinator_thread, decoder_thread],
            stats,
            settings: config.session.clone(),
            closed: false,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Recognition pool counters
    pub fn pool_stats(&self) -> Arc<PoolStats> {
        Arc::clone(&self.stats)
    }

    pub fn pause(&self) {
        self.post(CoordinatorMessage::Pause);
    }

    pub fn resume(&self) {
        self.post(CoordinatorMessage::Resume);
    }

    /// Shutter press. Pauses and shows the last result in continuous mode.
    pub fn trigger_single_shot(&self) {
        self.post(CoordinatorMessage::Shutter);
    }

    pub fn trigger_continuous_toggle(&self) {
        self.post(CoordinatorMessage::ToggleContinuous);
    }

    /// Focus once after the configured delay
    pub fn request_focus(&self) {
        self.post(CoordinatorMessage::RequestFocus);
    }

    /// Go back to preview after a single-shot result
    pub fn restart_preview(&self) {
        self.post(CoordinatorMessage::RestartPreview);
    }

    /// Current coordinator state, or `None` once the session is gone
    pub fn state(&self) -> Option<CaptureState> {
        let (tx, rx) = bounded(1);
        self.coordinator
            .post(CoordinatorMessage::QueryState(tx))
            .ok()?;
        rx.recv_timeout(self.settings.query_timeout()).ok()
    }

    /// Stop the session, waiting at most the teardown timeout
    pub fn shutdown(mut self) -> TeardownStatus {
        self.close()
    }

    fn post(&self, msg: CoordinatorMessage) {
        if self.coordinator.post(msg).is_err() {
            debug!("Session {} already closed", self.id);
        }
    }

    fn close(&mut self) -> TeardownStatus {
        if self.closed {
            return TeardownStatus::Clean;
        }
        self.closed = true;

        let timeout = self.settings.teardown_timeout();
        let deadline = Instant::now() + timeout;
        let mut status = TeardownStatus::Clean;

        let (ack_tx, ack_rx) = bounded(1);
        if self
            .coordinator
            .post(CoordinatorMessage::Shutdown { ack: ack_tx })
            .is_ok()
            && ack_rx.recv_deadline(deadline).is_err()
        {
            warn!("Capture coordinator did not stop within {:?}", timeout);
            status = TeardownStatus::TimedOut;
        }

        // The coordinator normally sends this first
        self.decoder.quit();
        if let Err(RecvTimeoutError::Timeout) = self.decoder_done.recv_deadline(deadline) {
            warn!("Decode worker did not stop within {:?}", timeout);
            status = TeardownStatus::TimedOut;
        }

        for thread in self.threads.drain(..) {
            if thread.is_finished() {
                let _ = thread.join();
            }
        }

        info!("Capture session {} closed ({:?})", self.id, status);
        status
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if !self.closed {
            self.close();
        }
    }
}

/// Report a failed start and release the camera
fn abort_open(
    mut camera: Box<dyn CameraSession>,
    mut sink: Box<dyn PresentationSink>,
    what: &'static str,
    source: std::io::Error,
) -> SessionError {
    error!("Failed to start {}: {}", what, source);
    sink.on_session_error(SessionErrorKind::Internal, &source.to_string());
    camera.close();
    SessionError::Spawn { what, source }
}

/// Coordinator thread body
fn run_coordinator(mut coordinator: CaptureCoordinator, rx: Receiver<CoordinatorMessage>) {
    info!("Capture coordinator thread starting...");
    coordinator.start();

    loop {
        let received = match coordinator.next_deadline() {
            Some(deadline) => rx.recv_deadline(deadline),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match received {
            Ok(msg) => {
                if coordinator.handle(msg) == Flow::Exit {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        coordinator.fire_due_timers(Instant::now());
    }

    info!("Capture coordinator thread exiting...");
}
