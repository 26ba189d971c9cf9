//! Recognition tasks and the pool they run on
//!
//! Each decode request becomes one [`RecognitionTask`]. Tasks run on blocking
//! threads of a small tokio runtime and report back by posting a message into
//! the coordinator's mailbox.

use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use image::GrayImage;
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, warn};

use crate::error::EngineFault;
use crate::shared::{CoordinatorHandle, CoordinatorMessage, DecodeMode};
use crate::vision::{FailureReason, RecognitionEngine, RecognitionOutcome};

/// One unit of recognition work
pub struct RecognitionTask {
    pub image: GrayImage,
    pub mode: DecodeMode,
    pub engine: Arc<dyn RecognitionEngine>,
    pub min_mean_confidence: i32,
    pub clear_after_continuous: bool,
    pub coordinator: CoordinatorHandle,
}

impl RecognitionTask {
    /// Run the engine and apply the acceptance rules
    pub fn recognize(&self) -> RecognitionOutcome {
        let start = Instant::now();
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.engine.recognize(&self.image)))
            .unwrap_or_else(|payload| Err(EngineFault::new(panic_message(payload.as_ref()))));
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(output) => {
                let outcome = RecognitionOutcome::from_engine(
                    output,
                    elapsed_ms,
                    self.min_mean_confidence,
                );
                if self.mode == DecodeMode::Continuous && self.clear_after_continuous {
                    self.engine.clear_state();
                }
                outcome
            }
            Err(fault) => {
                warn!("Recognition engine fault after {} ms: {}", elapsed_ms, fault);
                self.engine.clear_state();
                self.coordinator.request_stop();
                RecognitionOutcome::failed(
                    FailureReason::EngineFault {
                        message: fault.message,
                    },
                    elapsed_ms,
                )
            }
        }
    }

    /// Post the outcome to the coordinator
    pub fn deliver(&self, outcome: RecognitionOutcome) {
        let msg = CoordinatorMessage::decode_result(self.mode, outcome);
        if self.coordinator.post(msg).is_err() {
            debug!("Coordinator gone, dropping {:?} result", self.mode);
            self.coordinator.request_stop();
        }
    }

    pub fn run(self) {
        let outcome = self.recognize();
        self.deliver(outcome);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("engine panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("engine panicked: {}", s)
    } else {
        "engine panicked".to_string()
    }
}

/// Counters shared between the pool and its tasks
#[derive(Debug, Default)]
pub struct PoolStats {
    dispatched: AtomicUsize,
    in_flight: AtomicUsize,
    continuous_in_flight: AtomicUsize,
    continuous_peak: AtomicUsize,
}

impl PoolStats {
    /// Tasks handed to the pool since it started
    pub fn dispatched(&self) -> usize {
        self.dispatched.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn continuous_in_flight(&self) -> usize {
        self.continuous_in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of continuous tasks ever in flight at once
    pub fn continuous_peak(&self) -> usize {
        self.continuous_peak.load(Ordering::SeqCst)
    }
}

/// Marks a task as in flight until dropped
struct InFlightGuard {
    stats: Arc<PoolStats>,
    continuous: bool,
}

impl InFlightGuard {
    fn new(stats: Arc<PoolStats>, mode: DecodeMode) -> Self {
        let continuous = mode == DecodeMode::Continuous;
        stats.dispatched.fetch_add(1, Ordering::SeqCst);
        stats.in_flight.fetch_add(1, Ordering::SeqCst);
        if continuous {
            let now = stats.continuous_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            stats.continuous_peak.fetch_max(now, Ordering::SeqCst);
        }
        Self { stats, continuous }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.stats.in_flight.fetch_sub(1, Ordering::SeqCst);
        if self.continuous {
            self.stats.continuous_in_flight.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

/// Bounded pool for recognition tasks
pub struct RecognitionPool {
    runtime: Runtime,
    stats: Arc<PoolStats>,
}

impl RecognitionPool {
    /// Create a pool running at most `size` engine calls at once
    pub fn new(size: usize) -> io::Result<Self> {
        let size = size.max(1);
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(size)
            .thread_name("recognition")
            .build()?;

        debug!("Recognition pool started with {} threads", size);

        Ok(Self {
            runtime,
            stats: Arc::new(PoolStats::default()),
        })
    }

    pub fn stats(&self) -> Arc<PoolStats> {
        Arc::clone(&self.stats)
    }

    pub fn spawn(&self, task: RecognitionTask) {
        let guard = InFlightGuard::new(Arc::clone(&self.stats), task.mode);
        self.runtime.spawn_blocking(move || {
            let outcome = task.recognize();
            // Leave the in-flight count before the coordinator can react
            drop(guard);
            task.deliver(outcome);
        });
    }

    /// Stop the pool without waiting for running engine calls
    pub fn shutdown(self) {
        let in_flight = self.stats.in_flight();
        if in_flight > 0 {
            debug!("Abandoning {} in-flight recognition tasks", in_flight);
        }
        self.runtime.shutdown_background();
    }
}
