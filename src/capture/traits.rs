//! Capture engine trait definitions
//!
//! Platform-agnostic contract between the recording controller and whatever
//! actually grabs frames and writes the video file.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Prefix native engines put in front of permission failures
pub const PERMISSION_ERROR_PREFIX: &str = "SCREEN_RECORDING_PERMISSION_REQUIRED:";

const DEFAULT_PERMISSION_MESSAGE: &str = "screen recording permission required for video capture";

/// Fault reported by a capture engine
#[derive(Error, Debug)]
pub enum EngineFault {
    #[error("{0}")]
    PermissionRequired(String),

    #[error("capture unavailable: {0}")]
    Unavailable(String),

    #[error("device error: {0}")]
    Device(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineFault {
    /// Interpret a raw message coming back from a native engine
    pub fn from_message(message: &str) -> Self {
        match message.strip_prefix(PERMISSION_ERROR_PREFIX) {
            Some(rest) => {
                let trimmed = rest.trim();
                if trimmed.is_empty() {
                    EngineFault::PermissionRequired(DEFAULT_PERMISSION_MESSAGE.to_string())
                } else {
                    EngineFault::PermissionRequired(trimmed.to_string())
                }
            }
            None => EngineFault::Device(message.trim().to_string()),
        }
    }

    pub fn is_permission(&self) -> bool {
        matches!(self, EngineFault::PermissionRequired(_))
    }
}

/// How a capture run ended, as decided by the engine
#[derive(Debug)]
pub enum EngineOutcome {
    /// The requested duration elapsed and the file was finalized
    Finished,
    /// A stop request was honored
    Stopped,
    /// The engine failed mid-run
    Fault(EngineFault),
}

/// A capture backend.
///
/// `prepare` is called by the controller's initializer and may be retried
/// after a failure. `open` starts one capture run writing to `path` that
/// ends on its own after `duration`.
pub trait CaptureEngine: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &str;

    /// Check permissions and devices
    fn prepare(&self) -> Result<(), EngineFault>;

    /// Start capturing
    fn open(&self, path: &Path, duration: Duration) -> Result<Arc<dyn EngineHandle>, EngineFault>;
}

/// A running capture
pub trait EngineHandle: Send + Sync {
    /// Ask the engine to stop early. Must be safe to call from any thread,
    /// more than once, and after the run has ended.
    fn request_stop(&self);

    /// Block until the run ends. Called exactly once per handle.
    fn wait(&self) -> EngineOutcome;
}
