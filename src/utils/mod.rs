//! Shared utilities

pub mod error;

pub use error::{ErrorMessage, ErrorResponse, RecorderError, RecorderResult, StatusCode};
