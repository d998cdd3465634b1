//! Recording session control
//!
//! - RecordingController: one blocking session at a time, cancellable from
//!   any thread
//! - Session phase machine and reports
//! - Timestamped segment recording on top of the controller

pub mod controller;
pub mod segment;
pub mod state;

pub use controller::{RecordingController, RecordingEvent};
pub use segment::{SegmentOptions, SegmentRecorder, SegmentResult};
pub use state::{RecordingReport, RecordingSession, SessionPhase};
