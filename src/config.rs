//! Configuration
//!
//! Loaded from `screenrec.json` (or an explicit path), with environment
//! overrides applied on top. Every field has a default, so a partial file is
//! fine.

use crate::utils::error::{RecorderError, RecorderResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File looked up in the working directory when no path is given
pub const DEFAULT_FILE_NAME: &str = "screenrec.json";

/// Marker for a config built purely from defaults
pub const DEFAULTS_SOURCE: &str = "<defaults>";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub video: VideoConfig,
    pub logging: LoggingConfig,

    /// Where the configuration came from
    #[serde(skip)]
    pub source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory for segment recordings
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Segment length in seconds
    pub chunk_seconds: u64,
    /// Container format
    pub format: String,
    /// Capture backend (`ffmpeg` or `synthetic`)
    pub backend: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `text` or `json`
    pub format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            video: VideoConfig::default(),
            logging: LoggingConfig::default(),
            source: DEFAULTS_SOURCE.to_string(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("recordings"),
        }
    }
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            chunk_seconds: 300,
            format: "mp4".to_string(),
            backend: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// An explicit `path` must exist. Without one, `./screenrec.json` is read
    /// if present and defaults are used otherwise.
    pub fn load(path: Option<&Path>) -> RecorderResult<Self> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Load with an injectable env lookup
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> RecorderResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let explicit = path.is_some();
        let candidate = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_FILE_NAME));

        let mut config = match std::fs::read_to_string(&candidate) {
            Ok(content) => {
                let mut config: Config = serde_json::from_str(&content).map_err(|e| {
                    RecorderError::Config(format!("parse {}: {e}", candidate.display()))
                })?;
                config.source = candidate.display().to_string();
                config
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !explicit => Config::default(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RecorderError::Config(format!(
                    "config file {} not found",
                    candidate.display()
                )));
            }
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", candidate.display(), e);
                return Err(e.into());
            }
        };

        config.apply_env(lookup);
        config.validate()?;
        tracing::debug!("Loaded configuration from {}", config.source);
        Ok(config)
    }

    fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("SCREENREC_OUTPUT_DIR").filter(|v| !v.trim().is_empty()) {
            self.paths.output_dir = PathBuf::from(dir.trim());
        }
        if let Some(backend) = lookup("SCREENREC_BACKEND").filter(|v| !v.trim().is_empty()) {
            self.video.backend = Some(backend.trim().to_string());
        }
        if let Some(level) = lookup("SCREENREC_LOG_LEVEL").filter(|v| !v.trim().is_empty()) {
            self.logging.level = level.trim().to_lowercase();
        }
    }

    /// Check value ranges
    pub fn validate(&self) -> RecorderResult<()> {
        if self.video.chunk_seconds == 0 {
            return Err(RecorderError::Config(
                "video.chunk_seconds must be positive".to_string(),
            ));
        }
        let format = self.video.format.trim();
        if format.is_empty() {
            return Err(RecorderError::Config("video.format must not be empty".to_string()));
        }
        if !crate::recorder::segment::SUPPORTED_FORMATS.contains(&format) {
            return Err(RecorderError::Config(format!(
                "video.format {format:?} is not supported"
            )));
        }
        match self.logging.format.as_str() {
            "text" | "json" => Ok(()),
            other => Err(RecorderError::Config(format!(
                "logging.format must be \"text\" or \"json\", got {other:?}"
            ))),
        }
    }
}
