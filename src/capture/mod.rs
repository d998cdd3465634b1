//! Capture engines
//!
//! The controller only talks to [`CaptureEngine`]; this module provides the
//! ffmpeg-backed engine, a synthetic engine, and host detection.

pub mod environment;
pub mod ffmpeg;
pub mod permissions;
pub mod synthetic;
pub mod traits;

pub use environment::{Environment, Provider};
pub use ffmpeg::FfmpegEngine;
pub use permissions::{
    has_screen_recording_permission, request_screen_recording, PermissionStatus, ProbeResult,
};
pub use synthetic::SyntheticEngine;
pub use traits::{CaptureEngine, EngineFault, EngineHandle, EngineOutcome};
