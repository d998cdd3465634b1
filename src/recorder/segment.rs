//! Timestamped segment recording
//!
//! Records fixed-length segments into a directory, naming each file after the
//! moment it started (`segment_20240201T120000.mp4`).

use super::controller::RecordingController;
use super::state::SessionPhase;
use crate::utils::error::{RecorderError, RecorderResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Container formats the capture engines can write
pub const SUPPORTED_FORMATS: &[&str] = &["mp4", "mov"];

/// Clock used to stamp segment names
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Options for segment recording
#[derive(Clone)]
pub struct SegmentOptions {
    /// Length of each segment in seconds
    pub chunk_seconds: u64,
    /// File extension / container
    pub format: String,
    /// Defaults to `Utc::now`
    pub clock: Option<Clock>,
}

/// Output of one segment
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentResult {
    pub file: PathBuf,
    pub started: DateTime<Utc>,
    pub ended: DateTime<Utc>,
    pub phase: SessionPhase,
}

/// Records one segment at a time through a [`RecordingController`]
pub struct SegmentRecorder {
    controller: Arc<RecordingController>,
    chunk_seconds: u64,
    format: String,
    clock: Clock,
}

impl SegmentRecorder {
    pub fn new(
        controller: Arc<RecordingController>,
        options: SegmentOptions,
    ) -> RecorderResult<Self> {
        if options.chunk_seconds == 0 {
            return Err(RecorderError::InvalidArgument(
                "chunk seconds must be positive".to_string(),
            ));
        }
        let format = options.format.trim().to_lowercase();
        if format.is_empty() {
            return Err(RecorderError::InvalidArgument("format must not be empty".to_string()));
        }
        if !SUPPORTED_FORMATS.contains(&format.as_str()) {
            return Err(RecorderError::InvalidArgument(format!(
                "format {format:?} is not supported (expected one of {})",
                SUPPORTED_FORMATS.join(", ")
            )));
        }

        Ok(Self {
            controller,
            chunk_seconds: options.chunk_seconds,
            format,
            clock: options.clock.unwrap_or_else(|| Arc::new(Utc::now) as Clock),
        })
    }

    /// File name for a segment starting at `started`
    pub fn segment_name(&self, started: DateTime<Utc>) -> String {
        format!("segment_{}.{}", started.format("%Y%m%dT%H%M%S"), self.format)
    }

    /// Record one segment into `dest_dir`, blocking until it ends
    pub fn record(&self, dest_dir: &Path) -> RecorderResult<SegmentResult> {
        if dest_dir.as_os_str().is_empty() {
            return Err(RecorderError::InvalidPath(
                "destination directory must not be empty".to_string(),
            ));
        }
        std::fs::create_dir_all(dest_dir).map_err(|e| {
            RecorderError::InvalidPath(format!("ensure destination {}: {e}", dest_dir.display()))
        })?;

        let started = (self.clock)();
        let file = dest_dir.join(self.segment_name(started));
        tracing::info!("Recording segment {:?}", file);

        let report = self
            .controller
            .start_recording(&file, self.chunk_seconds as f64)?;

        let ended = match report.phase {
            SessionPhase::Cancelled => {
                started + chrono::Duration::milliseconds(report.duration_ms as i64)
            }
            _ => started + chrono::Duration::seconds(self.chunk_seconds as i64),
        };

        Ok(SegmentResult {
            file,
            started,
            ended,
            phase: report.phase,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::SyntheticEngine;
    use chrono::TimeZone;

    fn fixed_clock() -> Clock {
        Arc::new(|| Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap())
    }

    fn controller() -> Arc<RecordingController> {
        let controller = Arc::new(RecordingController::new(Arc::new(SyntheticEngine::new())));
        controller.initialize().unwrap();
        controller
    }

    fn options(chunk_seconds: u64, format: &str) -> SegmentOptions {
        SegmentOptions {
            chunk_seconds,
            format: format.to_string(),
            clock: Some(fixed_clock()),
        }
    }

    #[test]
    fn test_options_validation() {
        assert!(SegmentRecorder::new(controller(), options(0, "mp4")).is_err());
        assert!(SegmentRecorder::new(controller(), options(5, "")).is_err());
        assert!(SegmentRecorder::new(controller(), options(5, "webm")).is_err());
        assert!(SegmentRecorder::new(controller(), options(5, "MP4")).is_ok());
    }

    #[test]
    fn test_segment_written_with_timestamped_name() {
        let recorder = SegmentRecorder::new(controller(), options(1, "mp4")).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("segments");

        let result = recorder.record(&dest).unwrap();

        assert_eq!(result.file, dest.join("segment_20240201T120000.mp4"));
        assert!(result.file.exists());
        assert_eq!(result.phase, SessionPhase::Completed);
        assert_eq!((result.ended - result.started).num_seconds(), 1);
    }

    #[test]
    fn test_segment_requires_initialized_controller() {
        let controller = Arc::new(RecordingController::new(Arc::new(SyntheticEngine::new())));
        let recorder = SegmentRecorder::new(controller, options(1, "mov")).unwrap();
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            recorder.record(dir.path()),
            Err(RecorderError::NotInitialized)
        ));
    }
}
