//! Recording state management
//!
//! Defines the session phase machine and the record kept for each session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Phase of the recording session
///
/// `Idle -> Active -> {Completed, Cancelled, Failed} -> Idle`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    /// No recording in progress
    Idle,
    /// A start call is blocked on the capture engine
    Active,
    /// The requested duration elapsed and the file was written
    Completed,
    /// Stopped on request
    Cancelled,
    /// The capture engine reported a fault
    Failed,
}

impl Default for SessionPhase {
    fn default() -> Self {
        Self::Idle
    }
}

impl SessionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionPhase::Completed | SessionPhase::Cancelled | SessionPhase::Failed
        )
    }
}

/// One recording attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingSession {
    pub id: Uuid,

    /// Output file
    pub path: PathBuf,

    /// Requested duration in seconds
    pub duration_secs: f64,

    pub started_at: DateTime<Utc>,

    pub ended_at: Option<DateTime<Utc>>,
}

impl RecordingSession {
    /// Create a new session starting now
    pub fn new(path: PathBuf, duration_secs: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            path,
            duration_secs,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// End the session
    pub fn end(&mut self) {
        if self.ended_at.is_none() {
            self.ended_at = Some(Utc::now());
        }
    }

    /// Wall time between start and end (or now, while running)
    pub fn elapsed_ms(&self) -> f64 {
        let end = self.ended_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_milliseconds().max(0) as f64
    }

    /// Build the report for a finished session
    pub fn report(&self, phase: SessionPhase) -> RecordingReport {
        RecordingReport {
            session_id: self.id,
            path: self.path.clone(),
            phase,
            duration_ms: self.elapsed_ms(),
            started_at: self.started_at,
            ended_at: self.ended_at.unwrap_or_else(Utc::now),
        }
    }
}

/// Summary of a finished recording
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingReport {
    pub session_id: Uuid,

    pub path: PathBuf,

    /// Terminal phase the session reached
    pub phase: SessionPhase,

    /// Wall-clock duration in milliseconds
    pub duration_ms: f64,

    pub started_at: DateTime<Utc>,

    pub ended_at: DateTime<Utc>,
}

impl RecordingReport {
    pub fn is_cancelled(&self) -> bool {
        self.phase == SessionPhase::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_phases() {
        assert!(!SessionPhase::Idle.is_terminal());
        assert!(!SessionPhase::Active.is_terminal());
        assert!(SessionPhase::Completed.is_terminal());
        assert!(SessionPhase::Cancelled.is_terminal());
        assert!(SessionPhase::Failed.is_terminal());
        assert_eq!(SessionPhase::default(), SessionPhase::Idle);
    }

    #[test]
    fn test_session_end_is_sticky() {
        let mut session = RecordingSession::new(PathBuf::from("/tmp/out.mp4"), 5.0);
        session.end();
        let first = session.ended_at;
        session.end();
        assert_eq!(session.ended_at, first);
        assert!(session.elapsed_ms() >= 0.0);
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let mut session = RecordingSession::new(PathBuf::from("/tmp/out.mp4"), 1.0);
        session.end();
        let report = session.report(SessionPhase::Cancelled);
        assert!(report.is_cancelled());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["phase"], "cancelled");
        assert!(json.get("sessionId").is_some());
        assert!(json.get("durationMs").is_some());
    }
}
