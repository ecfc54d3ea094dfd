//! Per-session identity and output layout.

use crate::config::Config;
use crate::error::Result;
use chrono::{DateTime, Local, Utc};
use std::path::{Path, PathBuf};

/// Immutable facts about one recording session: its id, start time, output
/// folder, and the configuration it runs under.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub folder: PathBuf,
    pub config: Config,
}

impl SessionContext {
    /// Creates the session folder under the configured save directory. The
    /// session id is derived from the local start time.
    pub fn create(config: &Config) -> Result<Self> {
        let started_at = Utc::now();
        let session_id = format!("session_{}", Local::now().format("%Y-%m-%d_%H-%M-%S"));
        Self::create_named(config, session_id, started_at)
    }

    /// Creates the session folder with an explicit id and start time.
    pub fn create_named(
        config: &Config,
        session_id: String,
        started_at: DateTime<Utc>,
    ) -> Result<Self> {
        let folder = config.session.save_dir.join(&session_id);
        std::fs::create_dir_all(&folder)?;
        Ok(Self {
            session_id,
            started_at,
            folder,
            config: config.clone(),
        })
    }

    pub fn transcript_path(&self) -> PathBuf {
        self.file_path(".txt")
    }

    pub fn summary_path(&self) -> PathBuf {
        self.file_path("_summary.txt")
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.file_path("_meta.json")
    }

    pub fn log_path(&self) -> PathBuf {
        self.file_path("_log.txt")
    }

    pub fn audio_path(&self) -> PathBuf {
        self.file_path(".wav")
    }

    fn file_path(&self, suffix: &str) -> PathBuf {
        self.folder.join(format!("{}{suffix}", self.session_id))
    }

    /// File name of a sibling output, for metadata cross-references.
    pub fn file_name(path: &Path) -> String {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}
