//! Application Coordinator
//!
//! Wires the synthetic camera, the simulated engine and the console sink into
//! a capture session and drives it like a user would.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::capture::synthetic::{SyntheticCamera, SyntheticCameraConfig};
use crate::config::AppConfig;
use crate::presentation::{BellCue, ConsoleSink, ShutterCue, SilentCue};
use crate::session::{CaptureSession, CaptureState, Collaborators, TeardownStatus};
use crate::vision::SimulatedEngine;

/// How often the demo presses buttons
const INTERACTION_INTERVAL: Duration = Duration::from_millis(750);

/// Simulated engine behaviour for the demo
#[derive(Debug, Clone)]
pub struct DemoOptions {
    pub text: String,
    pub confidence: i32,
    pub latency: Duration,
    /// Fault on every n-th recognition (0 = never)
    pub fault_every: u64,
    /// Ring the terminal bell on single-shot captures
    pub bell: bool,
}

impl Default for DemoOptions {
    fn default() -> Self {
        Self {
            text: "OCR CAPTURE DEMO".to_string(),
            confidence: 85,
            latency: Duration::from_millis(300),
            fault_every: 0,
            bell: false,
        }
    }
}

/// Main application coordinator
pub struct CaptureApp {
    config: AppConfig,
    session: Option<CaptureSession>,
}

impl CaptureApp {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            session: None,
        }
    }

    /// Open a session over the demo collaborators
    pub fn start(&mut self, options: &DemoOptions) -> Result<()> {
        let camera = SyntheticCamera::new(SyntheticCameraConfig::default());
        let engine = SimulatedEngine::new(options.text.clone(), options.confidence, options.latency)
            .with_fault_every(options.fault_every);
        let cue: Box<dyn ShutterCue> = if options.bell {
            Box::new(BellCue)
        } else {
            Box::new(SilentCue)
        };

        self.start_with(Collaborators {
            camera: Box::new(camera),
            engine: Arc::new(engine),
            sink: Box::new(ConsoleSink::new()),
            cue,
        })
    }

    /// Open a session over caller-provided collaborators
    pub fn start_with(&mut self, collaborators: Collaborators) -> Result<()> {
        if self.session.is_some() {
            warn!("Capture session already running");
            return Ok(());
        }
        let session = CaptureSession::open(&self.config, collaborators)
            .context("Failed to open capture session")?;
        info!("Capture session {} started", session.id());
        self.session = Some(session);
        Ok(())
    }

    /// Drive the session for `duration`.
    ///
    /// Presses the shutter whenever the preview is ready, returns to preview
    /// after a result, and resumes continuous capture after it stops.
    pub fn run_for(&self, duration: Duration) -> Result<()> {
        let session = self
            .session
            .as_ref()
            .context("Capture session not started")?;
        let deadline = Instant::now() + duration;

        while Instant::now() < deadline {
            match session.state() {
                Some(CaptureState::Preview) | Some(CaptureState::PreviewFocusing) => {
                    session.trigger_single_shot();
                }
                Some(CaptureState::Success) => session.restart_preview(),
                Some(CaptureState::ContinuousPaused) => {
                    info!("Continuous capture stopped, resuming");
                    session.resume();
                }
                Some(_) => {}
                None => {
                    warn!("Capture session stopped unexpectedly");
                    break;
                }
            }
            thread::sleep(INTERACTION_INTERVAL);
        }

        Ok(())
    }

    /// Check if a session is running
    pub fn is_running(&self) -> bool {
        self.session
            .as_ref()
            .map(|s| s.state().is_some())
            .unwrap_or(false)
    }

    /// Shut the session down
    pub fn stop(&mut self) -> Option<TeardownStatus> {
        let status = self.session.take().map(CaptureSession::shutdown);
        if let Some(status) = status {
            info!("Capture session stopped ({:?})", status);
        }
        status
    }
}

impl Drop for CaptureApp {
    fn drop(&mut self) {
        self.stop();
    }
}
