//! Synthetic capture engine
//!
//! Writes a small placeholder file instead of real video. Used on hosts
//! without a capture backend and by the test suite. Honors both the
//! requested duration and stop requests, and removes the partial file when
//! stopped early.

use super::traits::{CaptureEngine, EngineFault, EngineHandle, EngineOutcome};
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::{Condvar, Mutex};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Engine that fakes a recording
#[derive(Debug, Default)]
pub struct SyntheticEngine;

impl SyntheticEngine {
    pub fn new() -> Self {
        Self
    }
}

impl CaptureEngine for SyntheticEngine {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn prepare(&self) -> Result<(), EngineFault> {
        tracing::debug!("Synthetic engine ready");
        Ok(())
    }

    fn open(&self, path: &Path, duration: Duration) -> Result<Arc<dyn EngineHandle>, EngineFault> {
        // Create the file up front so open fails fast on unwritable targets
        File::create(path)?;
        tracing::debug!("Synthetic capture opened: {:?} for {:?}", path, duration);

        Ok(Arc::new(SyntheticHandle {
            path: path.to_path_buf(),
            duration,
            started: Utc::now(),
            opened_at: Instant::now(),
            stop_requested: Mutex::new(false),
            stop_signal: Condvar::new(),
        }))
    }
}

struct SyntheticHandle {
    path: PathBuf,
    duration: Duration,
    started: DateTime<Utc>,
    opened_at: Instant,
    stop_requested: Mutex<bool>,
    stop_signal: Condvar,
}

impl SyntheticHandle {
    fn finalize(&self) -> Result<(), EngineFault> {
        let ended = self.started
            + chrono::Duration::from_std(self.duration)
                .map_err(|e| EngineFault::Encode(e.to_string()))?;
        let mut file = File::create(&self.path)?;
        writeln!(
            file,
            "synthetic video segment from {} to {}",
            self.started.to_rfc3339_opts(SecondsFormat::Secs, true),
            ended.to_rfc3339_opts(SecondsFormat::Secs, true),
        )?;
        file.sync_all()?;
        Ok(())
    }
}

impl EngineHandle for SyntheticHandle {
    fn request_stop(&self) {
        let mut stop = self.stop_requested.lock();
        *stop = true;
        self.stop_signal.notify_all();
    }

    fn wait(&self) -> EngineOutcome {
        // A deadline past the end of `Instant` means only a stop ends the capture
        let deadline = self.opened_at.checked_add(self.duration);
        let mut stop = self.stop_requested.lock();
        while !*stop {
            match deadline {
                Some(deadline) => {
                    if self.stop_signal.wait_until(&mut stop, deadline).timed_out() {
                        break;
                    }
                }
                None => self.stop_signal.wait(&mut stop),
            }
        }
        let stopped = *stop;
        drop(stop);

        if stopped {
            if let Err(e) = fs::remove_file(&self.path) {
                tracing::warn!("Failed to remove partial file {:?}: {}", self.path, e);
            }
            return EngineOutcome::Stopped;
        }

        match self.finalize() {
            Ok(()) => EngineOutcome::Finished,
            Err(fault) => EngineOutcome::Fault(fault),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_finishes_and_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.mp4");

        let handle = SyntheticEngine::new()
            .open(&path, Duration::from_millis(20))
            .unwrap();
        assert!(matches!(handle.wait(), EngineOutcome::Finished));

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("synthetic video segment from "));
    }

    #[test]
    fn test_synthetic_stop_removes_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.mp4");

        let handle = SyntheticEngine::new()
            .open(&path, Duration::from_secs(30))
            .unwrap();
        let stopper = handle.clone();
        let started = Instant::now();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            stopper.request_stop();
        });

        assert!(matches!(handle.wait(), EngineOutcome::Stopped));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(!path.exists());
    }

    #[test]
    fn test_synthetic_huge_duration_still_stops() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.mp4");

        let handle = SyntheticEngine::new()
            .open(&path, Duration::from_secs_f64(1e19))
            .unwrap();
        let stopper = handle.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            stopper.request_stop();
        });

        assert!(matches!(handle.wait(), EngineOutcome::Stopped));
        assert!(!path.exists());
    }

    #[test]
    fn test_synthetic_open_fails_for_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.mp4");
        let result = SyntheticEngine::new().open(&path, Duration::from_secs(1));
        assert!(matches!(result, Err(EngineFault::Io(_))));
    }
}
