//! Capture environment detection
//!
//! Picks the capture backend for this host and reports whether it can be
//! used, together with the permission state behind that answer.

use super::ffmpeg::FfmpegEngine;
use super::permissions::{probe_screen_recording, PermissionStatus};
use super::synthetic::SyntheticEngine;
use super::traits::CaptureEngine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Environment variable selecting the capture backend
pub const BACKEND_ENV: &str = "SCREENREC_BACKEND";

/// Capture backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Ffmpeg,
    Synthetic,
}

impl Provider {
    /// Parse a backend name; unknown names fall back to ffmpeg
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "" | "ffmpeg" => Provider::Ffmpeg,
            "stub" | "synthetic" => Provider::Synthetic,
            other => {
                tracing::warn!("Unknown capture backend '{}', using ffmpeg", other);
                Provider::Ffmpeg
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Ffmpeg => "ffmpeg",
            Provider::Synthetic => "synthetic",
        }
    }
}

/// What the host offers for screen recording
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    pub provider: Provider,
    pub available: bool,
    pub permission: PermissionStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guidance: Option<String>,
}

impl Environment {
    /// Detect using the process environment. `backend` (usually from config)
    /// is used when `SCREENREC_BACKEND` is not set.
    pub fn detect(backend: Option<&str>) -> Self {
        Self::detect_with(backend, |key| std::env::var(key).ok())
    }

    /// Detect with an injectable env lookup
    pub fn detect_with<F>(backend: Option<&str>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider = lookup(BACKEND_ENV)
            .or_else(|| backend.map(str::to_string))
            .map(|name| Provider::parse(&name))
            .unwrap_or(Provider::Ffmpeg);
        let probe = probe_screen_recording(&lookup);

        let mut env = Environment {
            provider,
            available: true,
            permission: probe.status,
            message: probe.message,
            guidance: probe.guidance,
        };

        match provider {
            Provider::Synthetic => {
                env.message = "synthetic recorder stub".to_string();
            }
            Provider::Ffmpeg => {
                env.available = match env.permission {
                    PermissionStatus::Denied => false,
                    PermissionStatus::Unavailable => !cfg!(target_os = "macos"),
                    _ => true,
                };
                if !env.available && env.message.is_empty() {
                    env.message = "screen recording permission missing".to_string();
                }
            }
        }

        env
    }

    /// Build the engine for the detected provider
    pub fn engine(&self) -> Arc<dyn CaptureEngine> {
        match self.provider {
            Provider::Ffmpeg => Arc::new(FfmpegEngine::new()),
            Provider::Synthetic => Arc::new(SyntheticEngine::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::permissions::SCREEN_RECORDING_OVERRIDE;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_provider_parse() {
        assert_eq!(Provider::parse("stub"), Provider::Synthetic);
        assert_eq!(Provider::parse(" Synthetic "), Provider::Synthetic);
        assert_eq!(Provider::parse("ffmpeg"), Provider::Ffmpeg);
        assert_eq!(Provider::parse("vhs"), Provider::Ffmpeg);
    }

    #[test]
    fn test_env_var_beats_config_backend() {
        let env = Environment::detect_with(Some("ffmpeg"), lookup(&[(BACKEND_ENV, "stub")]));
        assert_eq!(env.provider, Provider::Synthetic);
        assert!(env.available);
        assert_eq!(env.message, "synthetic recorder stub");
    }

    #[test]
    fn test_config_backend_used_without_env() {
        let env = Environment::detect_with(Some("synthetic"), lookup(&[]));
        assert_eq!(env.provider, Provider::Synthetic);
    }

    #[test]
    fn test_denied_permission_makes_ffmpeg_unavailable() {
        let env = Environment::detect_with(
            None,
            lookup(&[(SCREEN_RECORDING_OVERRIDE, "denied")]),
        );
        assert_eq!(env.provider, Provider::Ffmpeg);
        assert!(!env.available);
        assert_eq!(env.permission, PermissionStatus::Denied);
        assert!(env.guidance.is_some());
    }

    #[test]
    fn test_synthetic_always_available() {
        let env = Environment::detect_with(
            None,
            lookup(&[(BACKEND_ENV, "stub"), (SCREEN_RECORDING_OVERRIDE, "denied")]),
        );
        assert!(env.available);
        assert_eq!(env.engine().name(), "synthetic");
    }
}
