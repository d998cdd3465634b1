//! screenrec - time-bounded screen recordings, cancellable from anywhere.
//!
//! The [`recorder::RecordingController`] runs at most one recording at a time:
//! the starting thread blocks until the capture engine finishes, fails, or
//! honors a cancel request made from another thread. [`api`] and [`ffi`]
//! expose a process-wide controller to Rust and C callers.

pub mod api;
pub mod capture;
pub mod config;
pub mod ffi;
pub mod recorder;
pub mod utils;

pub use api::{cancel_active, initialize, release_error_message, start_recording};
pub use utils::error::{ErrorMessage, RecorderError, RecorderResult, StatusCode};

use config::LoggingConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging
///
/// `RUST_LOG` wins over the configured level.
pub fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("screenrec={}", logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    let result = if logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };

    if let Err(e) = result {
        eprintln!("tracing already initialized: {e}");
        return;
    }

    tracing::info!("Starting screenrec v{}", env!("CARGO_PKG_VERSION"));
}
