use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

fn default_video_gap() -> i64 {
    33_000 // ~30 fps
}

fn default_audio_gap() -> i64 {
    23_000 // ~1024 samples at 44.1 kHz
}

fn default_progress_interval() -> u64 {
    100
}

/// Tunables of a merge run. Every field may be omitted from the JSON file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Gap in microseconds between the last video sample of a file and the first of the next.
    #[serde(default = "default_video_gap")]
    pub video_gap_us: i64,
    /// Same as `video_gap_us`, for audio.
    #[serde(default = "default_audio_gap")]
    pub audio_gap_us: i64,
    /// Minimum wall-clock time between two forwarded progress events.
    #[serde(default = "default_progress_interval")]
    pub progress_interval_ms: u64,
    /// Skip inputs after the first that cannot be opened instead of failing the run.
    #[serde(default)]
    pub skip_unopenable_inputs: bool,
    /// Leave the partially written output on disk when a run fails.
    #[serde(default)]
    pub keep_partial_output: bool,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            video_gap_us: default_video_gap(),
            audio_gap_us: default_audio_gap(),
            progress_interval_ms: default_progress_interval(),
            skip_unopenable_inputs: false,
            keep_partial_output: false,
        }
    }
}

impl MergeConfig {
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: MergeConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Gaps must be positive, otherwise the next file could start on the last timestamp of the previous one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.video_gap_us <= 0 {
            return Err(ConfigError::Invalid("video_gap_us must be positive".into()));
        }
        if self.audio_gap_us <= 0 {
            return Err(ConfigError::Invalid("audio_gap_us must be positive".into()));
        }
        Ok(())
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }
}
