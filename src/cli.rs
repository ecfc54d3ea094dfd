//! Command-line interface for stenogram
//!
//! Provides argument parsing using clap derive macros.

use crate::config::{Config, SummaryMode};
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Offline meeting and lecture transcription with periodic summaries
#[derive(Parser, Debug)]
#[command(
    name = "stenogram",
    version,
    about = "Offline meeting and lecture transcription with periodic summaries"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (repeat for more detail)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Audio input device (case-insensitive substring match)
    #[arg(long, value_name = "DEVICE")]
    pub device: Option<String>,

    /// Path to the Vosk model directory
    #[arg(long, value_name = "DIR")]
    pub model: Option<PathBuf>,

    /// Summarizer mode (extractive, abstractive)
    #[arg(long, value_name = "MODE", value_parser = parse_summary_mode)]
    pub summarizer: Option<SummaryMode>,

    /// Automatic summary interval (e.g. 300, 5m, 1h30m). 0 disables
    #[arg(long, value_name = "DURATION", value_parser = parse_interval_secs)]
    pub auto_summary: Option<u64>,

    /// Directory under which session folders are created
    #[arg(long, value_name = "DIR")]
    pub save_dir: Option<PathBuf>,
}

/// Parse an interval string into seconds.
///
/// Supports any duration format accepted by `humantime`: bare numbers
/// (seconds), single-unit (`30s`, `5m`, `2h`), and compound (`1h30m`).
fn parse_interval_secs(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(secs);
    }
    humantime::parse_duration(s)
        .map(|d| d.as_secs())
        .map_err(|e| e.to_string())
}

fn parse_summary_mode(s: &str) -> Result<SummaryMode, String> {
    s.parse()
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List available audio input devices
    Devices,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

impl Cli {
    /// Applies command-line overrides on top of a loaded configuration.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(device) = &self.device {
            config.audio.mic_device_name = Some(device.clone());
        }
        if let Some(model) = &self.model {
            config.recognizer.model_path = model.clone();
        }
        if let Some(mode) = self.summarizer {
            config.summary.mode = mode;
        }
        if let Some(secs) = self.auto_summary {
            config.summary.auto_summary_interval_seconds = secs;
        }
        if let Some(save_dir) = &self.save_dir {
            config.session.save_dir = save_dir.clone();
        }
    }
}
