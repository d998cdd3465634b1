//! FFmpeg capture engine
//!
//! Records the primary display by running `ffmpeg` with the platform's screen
//! grabber and a `-t` limit, so the duration is enforced by ffmpeg itself.
//! An early stop sends `q` on stdin, which makes ffmpeg flush and close the
//! container before exiting.
//!
//! The child runs in its own process group so a terminal Ctrl-C reaches only
//! this process, which then stops the capture through the controller.

use super::permissions::{probe_screen_recording_env, PermissionStatus};
use super::traits::{
    CaptureEngine, EngineFault, EngineHandle, EngineOutcome, PERMISSION_ERROR_PREFIX,
};
use parking_lot::Mutex;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Lines of ffmpeg stderr kept for fault messages
const STDERR_TAIL_LINES: usize = 8;

/// Capture frame rate
const DEFAULT_FPS: u32 = 30;

#[cfg(windows)]
const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;

/// Engine backed by an ffmpeg child process
#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    binary: PathBuf,
    fps: u32,
}

impl Default for FfmpegEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegEngine {
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from("ffmpeg"),
            fps: DEFAULT_FPS,
        }
    }

    /// Use a specific ffmpeg binary
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Build the ffmpeg argument list for one recording
    pub fn build_args(&self, path: &Path, duration: Duration) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-y".into(),
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
        ];
        args.extend(grabber_input_args(self.fps));
        args.extend([
            "-t".into(),
            format!("{:.3}", duration.as_secs_f64()),
            "-c:v".into(),
            "libx264".into(),
            "-preset".into(),
            "veryfast".into(),
            "-pix_fmt".into(),
            "yuv420p".into(),
            "-movflags".into(),
            "+faststart".into(),
            path.to_string_lossy().to_string(),
        ]);
        args
    }
}

#[cfg(target_os = "macos")]
fn grabber_input_args(fps: u32) -> Vec<String> {
    vec![
        "-f".into(),
        "avfoundation".into(),
        "-capture_cursor".into(),
        "1".into(),
        "-framerate".into(),
        fps.to_string(),
        "-i".into(),
        "Capture screen 0:none".into(),
    ]
}

#[cfg(target_os = "windows")]
fn grabber_input_args(fps: u32) -> Vec<String> {
    vec![
        "-f".into(),
        "gdigrab".into(),
        "-framerate".into(),
        fps.to_string(),
        "-i".into(),
        "desktop".into(),
    ]
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn grabber_input_args(fps: u32) -> Vec<String> {
    let display = std::env::var("DISPLAY").unwrap_or_else(|_| ":0.0".to_string());
    vec![
        "-f".into(),
        "x11grab".into(),
        "-framerate".into(),
        fps.to_string(),
        "-i".into(),
        display,
    ]
}

impl CaptureEngine for FfmpegEngine {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn prepare(&self) -> Result<(), EngineFault> {
        let probe = probe_screen_recording_env();
        if probe.status == PermissionStatus::Denied {
            return Err(EngineFault::from_message(&format!(
                "{PERMISSION_ERROR_PREFIX}{}",
                probe.message
            )));
        }

        let output = Command::new(&self.binary)
            .arg("-version")
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .map_err(|e| {
                EngineFault::Unavailable(format!(
                    "FFmpeg not found ({e}). Please install FFmpeg and add it to PATH."
                ))
            })?;
        if !output.status.success() {
            return Err(EngineFault::Unavailable(format!(
                "ffmpeg -version exited with {}",
                output.status
            )));
        }

        let version = String::from_utf8_lossy(&output.stdout);
        tracing::info!(
            "FFmpeg engine ready: {}",
            version.lines().next().unwrap_or("unknown version")
        );
        Ok(())
    }

    fn open(&self, path: &Path, duration: Duration) -> Result<Arc<dyn EngineHandle>, EngineFault> {
        let args = self.build_args(path, duration);
        tracing::debug!("Spawning {:?} {}", self.binary, args.join(" "));

        let mut command = Command::new(&self.binary);
        command
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        detach_process_group(&mut command);

        let mut child = command
            .spawn()
            .map_err(|e| EngineFault::Unavailable(format!("Failed to start FFmpeg: {e}")))?;

        let stdin = child.stdin.take();
        tracing::info!("Started FFmpeg capture to {:?} for {:.1}s", path, duration.as_secs_f64());

        Ok(Arc::new(FfmpegHandle {
            path: path.to_path_buf(),
            child: Mutex::new(Some(child)),
            stdin: Mutex::new(stdin),
            stop_requested: AtomicBool::new(false),
        }))
    }
}

#[cfg(unix)]
fn detach_process_group(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(windows)]
fn detach_process_group(command: &mut Command) {
    use std::os::windows::process::CommandExt;
    command.creation_flags(CREATE_NEW_PROCESS_GROUP);
}

#[cfg(not(any(unix, windows)))]
fn detach_process_group(_command: &mut Command) {}

struct FfmpegHandle {
    path: PathBuf,
    child: Mutex<Option<Child>>,
    stdin: Mutex<Option<ChildStdin>>,
    stop_requested: AtomicBool,
}

impl FfmpegHandle {
    fn remove_partial(&self) {
        if self.path.exists() {
            if let Err(e) = std::fs::remove_file(&self.path) {
                tracing::warn!("Failed to remove partial recording {:?}: {}", self.path, e);
            }
        }
    }
}

impl EngineHandle for FfmpegHandle {
    fn request_stop(&self) {
        if self.stop_requested.swap(true, Ordering::SeqCst) {
            return;
        }
        // Dropping stdin after `q` also signals EOF
        if let Some(mut stdin) = self.stdin.lock().take() {
            if let Err(e) = stdin.write_all(b"q").and_then(|_| stdin.flush()) {
                tracing::debug!("FFmpeg stdin closed before stop request: {}", e);
            }
        }
    }

    fn wait(&self) -> EngineOutcome {
        let Some(mut child) = self.child.lock().take() else {
            return EngineOutcome::Fault(EngineFault::Device("capture already collected".into()));
        };

        let mut stderr = String::new();
        if let Some(mut pipe) = child.stderr.take() {
            if let Err(e) = pipe.read_to_string(&mut stderr) {
                tracing::debug!("Failed to read FFmpeg stderr: {}", e);
            }
        }

        let status = match child.wait() {
            Ok(status) => status,
            Err(e) => {
                self.remove_partial();
                return EngineOutcome::Fault(EngineFault::Io(e));
            }
        };
        // Release stdin if no stop was ever requested
        drop(self.stdin.lock().take());

        // Any exit after a stop request counts as stopped; ffmpeg reports 255
        // when it was interrupted rather than asked to quit
        if self.stop_requested.load(Ordering::SeqCst) {
            if !status.success() {
                tracing::debug!("FFmpeg exited with {} after stop request", status);
            }
            self.remove_partial();
            EngineOutcome::Stopped
        } else if status.success() {
            EngineOutcome::Finished
        } else {
            self.remove_partial();
            let tail = stderr_tail(&stderr);
            tracing::warn!("FFmpeg exited with status {}: {}", status, tail);
            if tail.starts_with(PERMISSION_ERROR_PREFIX) {
                EngineOutcome::Fault(EngineFault::from_message(&tail))
            } else {
                EngineOutcome::Fault(EngineFault::Encode(format!(
                    "ffmpeg exited with {status}: {tail}"
                )))
            }
        }
    }
}

fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_args_bounds_duration() {
        let engine = FfmpegEngine::new();
        let args = engine.build_args(Path::new("/tmp/out.mp4"), Duration::from_millis(2500));
        let t = args.iter().position(|a| a == "-t").unwrap();
        assert_eq!(args[t + 1], "2.500");
        assert_eq!(args.last().unwrap(), "/tmp/out.mp4");
        assert!(args.contains(&"libx264".to_string()));
    }

    #[test]
    fn test_stderr_tail_keeps_last_lines() {
        let stderr = (0..20).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let tail = stderr_tail(&stderr);
        assert!(tail.starts_with("line 12"));
        assert!(tail.ends_with("line 19"));
    }

    #[cfg(unix)]
    fn fake_ffmpeg(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("fake-ffmpeg");
        // The output path is the last argument
        std::fs::write(
            &script,
            format!("#!/bin/sh\nfor out; do :; done\n{body}\n"),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    #[cfg(unix)]
    #[test]
    fn test_natural_exit_is_finished() {
        let dir = tempfile::tempdir().unwrap();
        let binary = fake_ffmpeg(dir.path(), r#"echo video > "$out"; exit 0"#);
        let path = dir.path().join("out.mp4");

        let engine = FfmpegEngine::new().with_binary(binary);
        let handle = engine.open(&path, Duration::from_secs(1)).unwrap();
        assert!(matches!(handle.wait(), EngineOutcome::Finished));
        assert!(path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_stop_sends_q_once_and_removes_partial() {
        let dir = tempfile::tempdir().unwrap();
        let binary = fake_ffmpeg(
            dir.path(),
            r#"echo partial > "$out"; cat > "$out.stdin"; exit 0"#,
        );
        let path = dir.path().join("out.mp4");

        let engine = FfmpegEngine::new().with_binary(binary);
        let handle = engine.open(&path, Duration::from_secs(30)).unwrap();
        handle.request_stop();
        handle.request_stop();

        assert!(matches!(handle.wait(), EngineOutcome::Stopped));
        assert!(!path.exists());
        let received = std::fs::read_to_string(dir.path().join("out.mp4.stdin")).unwrap();
        assert_eq!(received, "q");
    }

    #[cfg(unix)]
    #[test]
    fn test_interrupted_exit_after_stop_is_stopped() {
        let dir = tempfile::tempdir().unwrap();
        // ffmpeg exits 255 when interrupted
        let binary = fake_ffmpeg(
            dir.path(),
            concat!(
                r#"echo partial > "$out"; cat > /dev/null; "#,
                r#"echo "Exiting normally, received signal 2." >&2; exit 255"#,
            ),
        );
        let path = dir.path().join("out.mp4");

        let engine = FfmpegEngine::new().with_binary(binary);
        let handle = engine.open(&path, Duration::from_secs(30)).unwrap();
        handle.request_stop();

        assert!(matches!(handle.wait(), EngineOutcome::Stopped));
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_exit_is_encode_fault_with_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let binary = fake_ffmpeg(
            dir.path(),
            r#"echo partial > "$out"; echo "Unknown encoder 'libx264'" >&2; exit 1"#,
        );
        let path = dir.path().join("out.mp4");

        let engine = FfmpegEngine::new().with_binary(binary);
        let handle = engine.open(&path, Duration::from_secs(1)).unwrap();
        match handle.wait() {
            EngineOutcome::Fault(EngineFault::Encode(message)) => {
                assert!(message.contains("Unknown encoder 'libx264'"), "{message}");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(!path.exists());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_child_runs_in_own_process_group() {
        let dir = tempfile::tempdir().unwrap();
        let binary = fake_ffmpeg(
            dir.path(),
            concat!(
                "read -r pid _ _ _ pgrp _ < /proc/$$/stat\n",
                r#"[ "$pid" = "$pgrp" ] && echo own > "$out"; exit 0"#,
            ),
        );
        let path = dir.path().join("out.mp4");

        let engine = FfmpegEngine::new().with_binary(binary);
        let handle = engine.open(&path, Duration::from_secs(1)).unwrap();
        assert!(matches!(handle.wait(), EngineOutcome::Finished));
        assert_eq!(std::fs::read_to_string(&path).unwrap().trim(), "own");
    }

    #[test]
    fn test_prepare_fails_for_missing_binary() {
        let engine = FfmpegEngine::new().with_binary("/nonexistent/ffmpeg-binary");
        match engine.prepare() {
            Err(EngineFault::Unavailable(_)) | Err(EngineFault::PermissionRequired(_)) => {}
            other => panic!("unexpected prepare result: {other:?}"),
        }
    }
}
