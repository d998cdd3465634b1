//! Process-wide recording API
//!
//! One controller per process, created on first use with the engine picked by
//! [`Environment::detect`]. Every call reports a [`StatusCode`]; failures also
//! hand the caller an [`ErrorMessage`] to release.

use crate::capture::Environment;
use crate::recorder::{RecordingController, SessionPhase};
use crate::utils::error::{ErrorMessage, StatusCode};
use std::path::Path;
use std::sync::{Arc, OnceLock};

static CONTROLLER: OnceLock<Arc<RecordingController>> = OnceLock::new();

/// The process-wide controller
pub fn controller() -> Arc<RecordingController> {
    controller_with_backend(None)
}

/// The process-wide controller, creating it with `backend` when `SCREENREC_BACKEND`
/// is unset. Has no effect on the backend once the controller exists.
pub fn controller_with_backend(backend: Option<&str>) -> Arc<RecordingController> {
    CONTROLLER
        .get_or_init(|| {
            let env = Environment::detect(backend);
            tracing::info!(
                "Using {} capture backend (permission: {}, {})",
                env.provider.as_str(),
                env.permission.as_str(),
                env.message
            );
            Arc::new(RecordingController::new(env.engine()))
        })
        .clone()
}

/// Prepare the capture engine. Safe to call repeatedly.
pub fn initialize() -> StatusCode {
    match controller().initialize() {
        Ok(()) => StatusCode::Ok,
        Err(e) => e.status(),
    }
}

/// Record to `path` for `duration_secs`, blocking until the recording ends.
///
/// Returns `Ok` or `Cancelled` with no message; every other status carries a
/// message the caller must pass to [`release_error_message`].
pub fn start_recording(
    path: impl AsRef<Path>,
    duration_secs: f64,
) -> (StatusCode, Option<ErrorMessage>) {
    match controller().start_recording(path, duration_secs) {
        Ok(report) if report.phase == SessionPhase::Cancelled => (StatusCode::Cancelled, None),
        Ok(_) => (StatusCode::Ok, None),
        Err(e) => {
            if e.is_usage_error() {
                tracing::debug!("Recording rejected: {}", e);
            } else {
                tracing::warn!("Recording failed: {}", e);
            }
            (e.status(), Some(ErrorMessage::from(&e)))
        }
    }
}

/// Stop the active recording, if any
pub fn cancel_active() {
    controller().cancel_active();
}

/// Free a message returned by [`start_recording`]
pub fn release_error_message(message: ErrorMessage) {
    message.release();
}
