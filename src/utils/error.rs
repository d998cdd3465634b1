//! Error types and handling
//!
//! Errors raised by the recording controller, the status codes they map to at
//! the process boundary, and the owned message handed to callers on failure.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Controller error type
#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("recording subsystem is not initialized")]
    NotInitialized,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("a recording is already in progress")]
    AlreadyRecording,

    #[error("capture engine failure: {0}")]
    Engine(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl RecorderError {
    /// Status code reported for this error at the process boundary
    pub fn status(&self) -> StatusCode {
        match self {
            RecorderError::NotInitialized => StatusCode::NotInitialized,
            RecorderError::InvalidArgument(_) | RecorderError::Config(_) => {
                StatusCode::InvalidArgument
            }
            RecorderError::InvalidPath(_) => StatusCode::InvalidPath,
            RecorderError::AlreadyRecording => StatusCode::AlreadyRecording,
            RecorderError::Engine(_) | RecorderError::Io(_) => StatusCode::EngineFailure,
        }
    }

    /// Whether the error was detected before any engine interaction
    pub fn is_usage_error(&self) -> bool {
        !matches!(self.status(), StatusCode::EngineFailure)
    }
}

/// Result type alias using RecorderError
pub type RecorderResult<T> = Result<T, RecorderError>;

/// Outcome of a boundary call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCode {
    Ok,
    NotInitialized,
    InvalidArgument,
    InvalidPath,
    AlreadyRecording,
    /// A deliberate stop; not a failure
    Cancelled,
    EngineFailure,
}

impl StatusCode {
    /// Stable integer used across the C ABI
    pub fn as_raw(self) -> i32 {
        match self {
            StatusCode::Ok => 0,
            StatusCode::NotInitialized => 1,
            StatusCode::InvalidArgument => 2,
            StatusCode::InvalidPath => 3,
            StatusCode::AlreadyRecording => 4,
            StatusCode::Cancelled => 5,
            StatusCode::EngineFailure => 6,
        }
    }

    /// Ok and Cancelled are both non-error outcomes
    pub fn is_success(self) -> bool {
        matches!(self, StatusCode::Ok | StatusCode::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::NotInitialized => "NOT_INITIALIZED",
            StatusCode::InvalidArgument => "INVALID_ARGUMENT",
            StatusCode::InvalidPath => "INVALID_PATH",
            StatusCode::AlreadyRecording => "ALREADY_RECORDING",
            StatusCode::Cancelled => "CANCELLED",
            StatusCode::EngineFailure => "ENGINE_FAILURE",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owned error message handed to the caller of a failed start.
///
/// The caller owns the message once it is returned and gives it back through
/// [`ErrorMessage::release`] (or [`crate::api::release_error_message`]).
/// The type is deliberately not `Clone`: releasing consumes it, so a second
/// release does not compile.
#[derive(Debug, PartialEq, Eq)]
pub struct ErrorMessage(Box<str>);

impl ErrorMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into().into_boxed_str())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Free the message
    pub fn release(self) {
        drop(self);
    }

    /// Hand the message bytes over to a foreign owner
    pub(crate) fn into_string(self) -> String {
        self.0.into_string()
    }
}

impl fmt::Display for ErrorMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&RecorderError> for ErrorMessage {
    fn from(error: &RecorderError) -> Self {
        ErrorMessage::new(error.to_string())
    }
}

/// Error response for JSON reporting
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<RecorderError> for ErrorResponse {
    fn from(error: RecorderError) -> Self {
        ErrorResponse {
            code: error.status().as_str().to_string(),
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(RecorderError::NotInitialized.status(), StatusCode::NotInitialized);
        assert_eq!(
            RecorderError::Config("bad".into()).status(),
            StatusCode::InvalidArgument
        );
        assert_eq!(
            RecorderError::Io(std::io::Error::other("disk full")).status(),
            StatusCode::EngineFailure
        );
        assert!(RecorderError::AlreadyRecording.is_usage_error());
        assert!(!RecorderError::Engine("device lost".into()).is_usage_error());
    }

    #[test]
    fn test_raw_codes_are_stable() {
        let codes = [
            StatusCode::Ok,
            StatusCode::NotInitialized,
            StatusCode::InvalidArgument,
            StatusCode::InvalidPath,
            StatusCode::AlreadyRecording,
            StatusCode::Cancelled,
            StatusCode::EngineFailure,
        ];
        for (expected, code) in codes.iter().enumerate() {
            assert_eq!(code.as_raw(), expected as i32);
        }
        assert!(StatusCode::Cancelled.is_success());
        assert!(!StatusCode::EngineFailure.is_success());
    }

    #[test]
    fn test_status_serializes_as_code() {
        let json = serde_json::to_string(&StatusCode::AlreadyRecording).unwrap();
        assert_eq!(json, "\"ALREADY_RECORDING\"");
    }

    #[test]
    fn test_error_response_from_error() {
        let response = ErrorResponse::from(RecorderError::InvalidPath("empty path".into()));
        assert_eq!(response.code, "INVALID_PATH");
        assert_eq!(response.message, "invalid path: empty path");
    }

    #[test]
    fn test_error_message_release() {
        let message = ErrorMessage::from(&RecorderError::Engine("encode error".into()));
        assert_eq!(message.as_str(), "capture engine failure: encode error");
        message.release();
    }
}
