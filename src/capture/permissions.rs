//! Screen recording permission probing
//!
//! On macOS the CoreGraphics preflight decides; elsewhere capture needs no
//! grant. `SCREENREC_SCREEN_RECORDING` overrides the probe so permission
//! states can be exercised without touching the system TCC database.

use serde::{Deserialize, Serialize};

/// Environment variable that overrides the screen recording probe
pub const SCREEN_RECORDING_OVERRIDE: &str = "SCREENREC_SCREEN_RECORDING";

/// Coarse permission state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    Unknown,
    Granted,
    Denied,
    Prompt,
    Unavailable,
}

impl PermissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionStatus::Unknown => "unknown",
            PermissionStatus::Granted => "granted",
            PermissionStatus::Denied => "denied",
            PermissionStatus::Prompt => "prompt",
            PermissionStatus::Unavailable => "unavailable",
        }
    }
}

/// Result of probing a permission surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub status: PermissionStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guidance: Option<String>,
}

impl ProbeResult {
    fn new(status: PermissionStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            guidance: None,
        }
    }
}

/// Probe screen recording permission using the process environment
pub fn probe_screen_recording_env() -> ProbeResult {
    probe_screen_recording(|key| std::env::var(key).ok())
}

/// Probe screen recording permission with an injectable env lookup
pub fn probe_screen_recording<F>(lookup: F) -> ProbeResult
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup(SCREEN_RECORDING_OVERRIDE) {
        return interpret_override("screen recording", &value);
    }
    platform_probe()
}

#[cfg(target_os = "macos")]
fn platform_probe() -> ProbeResult {
    if has_screen_recording_permission() {
        ProbeResult::new(PermissionStatus::Granted, "screen recording permission granted")
    } else {
        ProbeResult::new(
            PermissionStatus::Prompt,
            "awaiting macOS screen recording authorisation",
        )
    }
}

#[cfg(not(target_os = "macos"))]
fn platform_probe() -> ProbeResult {
    ProbeResult::new(
        PermissionStatus::Unavailable,
        "screen recording permission is not applicable on this platform",
    )
}

fn interpret_override(name: &str, value: &str) -> ProbeResult {
    match value.trim().to_lowercase().as_str() {
        "granted" | "allow" | "allowed" | "yes" | "true" => ProbeResult::new(
            PermissionStatus::Granted,
            format!("{name} permission pre-authorised via env override"),
        ),
        "denied" | "no" | "false" | "blocked" => ProbeResult {
            status: PermissionStatus::Denied,
            message: format!("{name} permission denied via env override"),
            guidance: Some(format!(
                "use 'tccutil reset ScreenCapture' or update {SCREEN_RECORDING_OVERRIDE} to re-test"
            )),
        },
        "prompt" | "ask" => ProbeResult::new(
            PermissionStatus::Prompt,
            format!("{name} permission will prompt at runtime"),
        ),
        "unavailable" | "unsupported" => ProbeResult::new(
            PermissionStatus::Unavailable,
            format!("{name} permission unavailable on this platform"),
        ),
        _ => ProbeResult::new(
            PermissionStatus::Unknown,
            format!("{name} permission state unknown"),
        ),
    }
}

/// Check if screen recording permission is granted
pub fn has_screen_recording_permission() -> bool {
    #[cfg(target_os = "macos")]
    {
        core_graphics::access::ScreenCaptureAccess.preflight()
    }

    #[cfg(not(target_os = "macos"))]
    {
        true
    }
}

/// Request screen recording permission
///
/// On macOS this shows the system prompt the first time. Returns true if
/// permission was already granted.
pub fn request_screen_recording() -> bool {
    #[cfg(target_os = "macos")]
    {
        core_graphics::access::ScreenCaptureAccess.request()
    }

    #[cfg(not(target_os = "macos"))]
    {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_override(value: &'static str) -> ProbeResult {
        probe_screen_recording(move |key| {
            (key == SCREEN_RECORDING_OVERRIDE).then(|| value.to_string())
        })
    }

    #[test]
    fn test_override_granted() {
        for value in ["granted", "Allow", " yes ", "TRUE"] {
            assert_eq!(with_override(value).status, PermissionStatus::Granted);
        }
    }

    #[test]
    fn test_override_denied_has_guidance() {
        let result = with_override("blocked");
        assert_eq!(result.status, PermissionStatus::Denied);
        assert!(result.guidance.unwrap().contains("tccutil"));
    }

    #[test]
    fn test_override_other_states() {
        assert_eq!(with_override("ask").status, PermissionStatus::Prompt);
        assert_eq!(with_override("unsupported").status, PermissionStatus::Unavailable);
        assert_eq!(with_override("maybe").status, PermissionStatus::Unknown);
    }

    #[test]
    fn test_no_override_uses_platform() {
        let result = probe_screen_recording(|_| None);
        assert!(!result.message.is_empty());
        #[cfg(not(target_os = "macos"))]
        assert_eq!(result.status, PermissionStatus::Unavailable);
    }
}
