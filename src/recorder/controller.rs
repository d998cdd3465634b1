//! Recording controller
//!
//! Owns the single recording session, drives the capture engine, and lets any
//! thread cancel the session while the starting thread is blocked on it.

use super::state::{RecordingReport, RecordingSession, SessionPhase};
use crate::capture::traits::{CaptureEngine, EngineFault, EngineHandle, EngineOutcome};
use crate::utils::error::{RecorderError, RecorderResult};
use parking_lot::{Condvar, Mutex};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::broadcast;

/// Events emitted during recording
#[derive(Debug, Clone, PartialEq)]
pub enum RecordingEvent {
    /// Recording started
    Started { path: PathBuf },
    /// A stop was requested for the active session
    CancelRequested,
    /// Recording ran for its full duration
    Completed,
    /// Recording was stopped on request
    Cancelled,
    /// Error occurred
    Failed(String),
}

struct ActiveSession {
    session: RecordingSession,
    handle: Arc<dyn EngineHandle>,
    cancel_requested: bool,
}

#[derive(Default)]
struct ControllerState {
    phase: SessionPhase,
    active: Option<ActiveSession>,
    last: Option<RecordingReport>,
}

/// Terminal outcome slot filled once by the capture worker
#[derive(Default)]
struct Completion {
    slot: Mutex<Option<EngineOutcome>>,
    published: AtomicBool,
    ready: Condvar,
}

impl Completion {
    fn publish(&self, outcome: EngineOutcome) {
        let mut slot = self.slot.lock();
        if self.published.swap(true, Ordering::SeqCst) {
            return;
        }
        *slot = Some(outcome);
        self.ready.notify_all();
    }

    fn wait(&self) -> EngineOutcome {
        let mut slot = self.slot.lock();
        loop {
            if let Some(outcome) = slot.take() {
                return outcome;
            }
            self.ready.wait(&mut slot);
        }
    }
}

/// Publishes a fault if the worker unwinds before reporting
struct PublishOnDrop(Arc<Completion>);

impl Drop for PublishOnDrop {
    fn drop(&mut self) {
        self.0.publish(EngineOutcome::Fault(EngineFault::Device(
            "capture worker exited without reporting a result".to_string(),
        )));
    }
}

/// Controls at most one recording at a time
pub struct RecordingController {
    engine: Arc<dyn CaptureEngine>,

    /// Set once the engine's prerequisites are prepared; never reset
    initialized: AtomicBool,

    /// Serializes engine preparation
    init_lock: Mutex<()>,

    state: Mutex<ControllerState>,

    event_tx: broadcast::Sender<RecordingEvent>,
}

impl RecordingController {
    /// Create a controller driving the given engine
    pub fn new(engine: Arc<dyn CaptureEngine>) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            engine,
            initialized: AtomicBool::new(false),
            init_lock: Mutex::new(()),
            state: Mutex::new(ControllerState::default()),
            event_tx,
        }
    }

    /// Name of the engine in use
    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// Prepare the capture engine.
    ///
    /// A no-op after the first success; retries preparation after a failure.
    pub fn initialize(&self) -> RecorderResult<()> {
        let _guard = self.init_lock.lock();
        if self.initialized.load(Ordering::Acquire) {
            return Ok(());
        }

        match self.engine.prepare() {
            Ok(()) => {
                self.initialized.store(true, Ordering::Release);
                tracing::info!("Recording subsystem initialized ({})", self.engine.name());
                Ok(())
            }
            Err(fault) if fault.is_permission() => {
                tracing::warn!(
                    "Screen recording permission missing, grant it in System Settings > \
                     Privacy & Security > Screen Recording: {}",
                    fault
                );
                Err(RecorderError::Engine(fault.to_string()))
            }
            Err(fault) => {
                tracing::warn!("Recording subsystem initialization failed: {}", fault);
                Err(RecorderError::Engine(fault.to_string()))
            }
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Current session phase
    pub fn phase(&self) -> SessionPhase {
        self.state.lock().phase
    }

    /// Report of the most recently finished session
    pub fn last_report(&self) -> Option<RecordingReport> {
        self.state.lock().last.clone()
    }

    /// Subscribe to recording events
    pub fn subscribe(&self) -> broadcast::Receiver<RecordingEvent> {
        self.event_tx.subscribe()
    }

    /// Record `duration_secs` of screen to `path`, blocking until the
    /// recording completes, is cancelled, or fails.
    ///
    /// A cancelled recording is `Ok` with a report whose phase is
    /// [`SessionPhase::Cancelled`].
    pub fn start_recording(
        &self,
        path: impl AsRef<Path>,
        duration_secs: f64,
    ) -> RecorderResult<RecordingReport> {
        if !self.is_initialized() {
            return Err(RecorderError::NotInitialized);
        }
        let duration = validate_duration(duration_secs)?;
        let path = validate_path(path.as_ref())?;

        let handle = {
            let mut state = self.state.lock();
            if state.active.is_some() {
                tracing::debug!("Rejecting start for {:?}: recording already active", path);
                return Err(RecorderError::AlreadyRecording);
            }

            let mut session = RecordingSession::new(path.clone(), duration_secs);
            let handle = match self.engine.open(&path, duration) {
                Ok(handle) => handle,
                Err(fault) => {
                    session.end();
                    state.last = Some(session.report(SessionPhase::Failed));
                    drop(state);
                    tracing::error!("Failed to open capture for {:?}: {}", path, fault);
                    let _ = self.event_tx.send(RecordingEvent::Failed(fault.to_string()));
                    return Err(RecorderError::Engine(fault.to_string()));
                }
            };

            state.active = Some(ActiveSession {
                session,
                handle: handle.clone(),
                cancel_requested: false,
            });
            state.phase = SessionPhase::Active;
            handle
        };

        tracing::info!("Recording started: {:?} for {:.1}s", path, duration_secs);
        let _ = self.event_tx.send(RecordingEvent::Started { path });

        let outcome = await_outcome(handle);
        self.finish(outcome)
    }

    /// Ask the active recording to stop. No-op when nothing is recording.
    pub fn cancel_active(&self) {
        let handle = {
            let mut state = self.state.lock();
            let Some(active) = state.active.as_mut() else {
                tracing::debug!("Cancel requested with no active recording");
                return;
            };
            if active.cancel_requested {
                return;
            }
            active.cancel_requested = true;
            active.handle.clone()
        };

        tracing::info!("Cancelling active recording");
        handle.request_stop();
        let _ = self.event_tx.send(RecordingEvent::CancelRequested);
    }

    fn finish(&self, outcome: EngineOutcome) -> RecorderResult<RecordingReport> {
        let mut state = self.state.lock();
        let Some(mut active) = state.active.take() else {
            state.phase = SessionPhase::Idle;
            return Err(RecorderError::Engine(
                "recording session vanished before completion".to_string(),
            ));
        };

        active.session.end();
        let phase = match &outcome {
            EngineOutcome::Finished => SessionPhase::Completed,
            EngineOutcome::Stopped => SessionPhase::Cancelled,
            EngineOutcome::Fault(_) => SessionPhase::Failed,
        };
        state.phase = phase;
        let report = active.session.report(phase);
        state.last = Some(report.clone());
        state.phase = SessionPhase::Idle;
        drop(state);

        match outcome {
            EngineOutcome::Finished => {
                tracing::info!(
                    "Recording completed: {:?} ({:.0}ms)",
                    report.path,
                    report.duration_ms
                );
                let _ = self.event_tx.send(RecordingEvent::Completed);
                Ok(report)
            }
            EngineOutcome::Stopped => {
                tracing::info!("Recording cancelled after {:.0}ms", report.duration_ms);
                let _ = self.event_tx.send(RecordingEvent::Cancelled);
                Ok(report)
            }
            EngineOutcome::Fault(fault) => {
                tracing::error!("Recording failed: {}", fault);
                let message = fault.to_string();
                let _ = self.event_tx.send(RecordingEvent::Failed(message.clone()));
                Err(RecorderError::Engine(message))
            }
        }
    }
}

/// Wait for the engine on a worker thread and block until it reports
fn await_outcome(handle: Arc<dyn EngineHandle>) -> EngineOutcome {
    let completion = Arc::new(Completion::default());
    let worker_guard = PublishOnDrop(completion.clone());
    let worker_handle = handle.clone();

    let spawned = thread::Builder::new()
        .name("screenrec-capture".to_string())
        .spawn(move || {
            let outcome = worker_handle.wait();
            worker_guard.0.publish(outcome);
        });

    match spawned {
        Ok(_) => completion.wait(),
        Err(e) => {
            tracing::warn!("Failed to spawn capture worker, waiting inline: {}", e);
            handle.wait()
        }
    }
}

fn validate_duration(duration_secs: f64) -> RecorderResult<Duration> {
    if !duration_secs.is_finite() || duration_secs <= 0.0 {
        return Err(RecorderError::InvalidArgument(format!(
            "duration must be a positive number of seconds, got {duration_secs}"
        )));
    }
    Duration::try_from_secs_f64(duration_secs)
        .map_err(|e| RecorderError::InvalidArgument(format!("duration out of range: {e}")))
}

fn validate_path(path: &Path) -> RecorderResult<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(RecorderError::InvalidPath("output path is empty".to_string()));
    }
    if path.is_dir() {
        return Err(RecorderError::InvalidPath(format!(
            "{} is a directory",
            path.display()
        )));
    }

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    if !parent.is_dir() {
        return Err(RecorderError::InvalidPath(format!(
            "parent directory {} does not exist",
            parent.display()
        )));
    }

    // Probe writability with a file that is removed on drop
    tempfile::Builder::new()
        .prefix(".screenrec-probe")
        .tempfile_in(parent)
        .map_err(|e| {
            RecorderError::InvalidPath(format!(
                "parent directory {} is not writable: {e}",
                parent.display()
            ))
        })?;

    Ok(path.to_path_buf())
}
