//! Session metadata sidecar (`<session>_meta.json`).

use crate::error::{Result, StenogramError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything a later reader needs to interpret the session's output files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_seconds: i64,
    pub sample_rate: u32,
    pub channels: u16,
    pub block_duration_ms: u64,
    pub model_path: String,
    pub summary_mode: String,
    pub transcript_file: String,
    pub summary_file: Option<String>,
    pub audio_file: Option<String>,
    pub log_file: String,
    pub blocks_captured: u64,
    pub blocks_dropped: u64,
    pub segments: usize,
    pub words: usize,
    pub errors: usize,
}

impl SessionMetadata {
    /// Writes the metadata as pretty JSON.
    pub fn write(&self, path: &Path) -> Result<()> {
        let json =
            serde_json::to_string_pretty(self).map_err(|e| StenogramError::SinkWrite {
                sink: "metadata",
                message: format!("serialize: {e}"),
            })?;
        std::fs::write(path, json).map_err(|e| StenogramError::SinkWrite {
            sink: "metadata",
            message: format!("write {}: {e}", path.display()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_metadata() -> SessionMetadata {
        let started = Utc::now();
        SessionMetadata {
            session_id: "session_2026-08-23_10-00-00".to_string(),
            started_at: started,
            ended_at: started + Duration::seconds(90),
            duration_seconds: 90,
            sample_rate: 16_000,
            channels: 1,
            block_duration_ms: 500,
            model_path: "models/vosk-small-en".to_string(),
            summary_mode: "extractive".to_string(),
            transcript_file: "session_2026-08-23_10-00-00.txt".to_string(),
            summary_file: Some("session_2026-08-23_10-00-00_summary.txt".to_string()),
            audio_file: Some("session_2026-08-23_10-00-00.wav".to_string()),
            log_file: "session_2026-08-23_10-00-00_log.txt".to_string(),
            blocks_captured: 180,
            blocks_dropped: 2,
            segments: 14,
            words: 310,
            errors: 0,
        }
    }

    #[test]
    fn test_metadata_round_trips_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session_meta.json");

        let metadata = sample_metadata();
        metadata.write(&path).unwrap();

        let read: SessionMetadata =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(read.session_id, metadata.session_id);
        assert_eq!(read.blocks_dropped, 2);
        assert_eq!(read.segments, 14);
        assert_eq!(read.summary_file, metadata.summary_file);
    }

    #[test]
    fn test_write_to_missing_directory_fails() {
        let result = sample_metadata().write(Path::new("/nonexistent/dir/meta.json"));
        assert!(matches!(result, Err(StenogramError::SinkWrite { .. })));
    }
}
