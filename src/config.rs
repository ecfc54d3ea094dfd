//! Typed configuration for stenogram.
//!
//! The option set is deliberately closed: unknown keys in the TOML file are
//! rejected at load time as a fatal startup error, so typos never silently
//! fall back to defaults.

use crate::defaults;
use crate::error::{Result, StenogramError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub audio: AudioConfig,
    pub recognizer: RecognizerConfig,
    pub summary: SummaryConfig,
    pub session: SessionConfig,
}

/// Audio capture configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AudioConfig {
    /// Microphone device name (substring match, case-insensitive).
    /// None means the system default input device.
    pub mic_device_name: Option<String>,
    pub sample_rate: u32,
    pub channels: u16,
    pub block_duration_ms: u32,
    /// Capacity of the capture→recognition queue, in blocks.
    pub queue_capacity_blocks: usize,
}

/// Speech recognition configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RecognizerConfig {
    /// Path to the Vosk model directory.
    pub model_path: PathBuf,
}

/// Summarization configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SummaryConfig {
    pub mode: SummaryMode,
    /// Number of sentences kept by the extractive summarizer.
    pub extractive_sentences: usize,
    /// Automatic summary cadence in seconds. 0 disables interval summaries;
    /// the end-of-session summary always runs.
    pub auto_summary_interval_seconds: u64,
}

/// Session output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Directory under which per-session folders are created.
    pub save_dir: PathBuf,
}

/// Summarizer mode enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SummaryMode {
    /// Fast, ranking-based sentence extraction.
    #[default]
    Extractive,
    /// Slower, generative summarization (requires the `abstractive` feature).
    Abstractive,
}

impl std::fmt::Display for SummaryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SummaryMode::Extractive => write!(f, "extractive"),
            SummaryMode::Abstractive => write!(f, "abstractive"),
        }
    }
}

impl std::str::FromStr for SummaryMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "extractive" => Ok(SummaryMode::Extractive),
            "abstractive" => Ok(SummaryMode::Abstractive),
            other => Err(format!(
                "unknown summarizer mode '{other}' (expected extractive or abstractive)"
            )),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            mic_device_name: None,
            sample_rate: defaults::SAMPLE_RATE,
            channels: defaults::CHANNELS,
            block_duration_ms: defaults::BLOCK_DURATION_MS,
            queue_capacity_blocks: defaults::QUEUE_CAPACITY_BLOCKS,
        }
    }
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/vosk-model-small-en-us-0.15"),
        }
    }
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            mode: SummaryMode::Extractive,
            extractive_sentences: defaults::EXTRACTIVE_SENTENCES,
            auto_summary_interval_seconds: defaults::AUTO_SUMMARY_INTERVAL_SECONDS,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            save_dir: PathBuf::from(defaults::SAVE_DIR),
        }
    }
}

impl AudioConfig {
    /// Number of samples in one capture block (per channel, after downmix).
    pub fn block_samples(&self) -> usize {
        (self.sample_rate as u64 * self.block_duration_ms as u64 / 1000) as usize
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file is missing, contains invalid TOML, or
    /// contains unknown keys. Missing fields use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StenogramError::ConfigFileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                StenogramError::Io(e)
            }
        })?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file, or return defaults if the file does
    /// not exist. Malformed files are still an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(StenogramError::ConfigFileNotFound { .. }) => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
            Err(e) => Err(e),
        }
    }

    /// Validate configuration values.
    ///
    /// Rejects values the pipeline cannot run with; called on every load so
    /// a bad config fails before any resource is opened.
    pub fn validate(&self) -> Result<()> {
        if self.audio.sample_rate == 0 {
            return Err(StenogramError::ConfigInvalidValue {
                key: "audio.sample_rate".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.audio.channels != 1 && self.audio.channels != 2 {
            return Err(StenogramError::ConfigInvalidValue {
                key: "audio.channels".to_string(),
                message: format!("must be 1 or 2, got {}", self.audio.channels),
            });
        }
        if self.audio.block_duration_ms == 0 {
            return Err(StenogramError::ConfigInvalidValue {
                key: "audio.block_duration_ms".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.audio.queue_capacity_blocks == 0 {
            return Err(StenogramError::ConfigInvalidValue {
                key: "audio.queue_capacity_blocks".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.summary.extractive_sentences == 0 {
            return Err(StenogramError::ConfigInvalidValue {
                key: "summary.extractive_sentences".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Automatic summary interval, if enabled.
    pub fn auto_summary_interval(&self) -> Option<std::time::Duration> {
        match self.summary.auto_summary_interval_seconds {
            0 => None,
            secs => Some(std::time::Duration::from_secs(secs)),
        }
    }
}
