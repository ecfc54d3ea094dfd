//! Transcript file sink.
//!
//! Closed segments are appended as `[HH:MM:SS] text` lines, with the
//! timestamp measured from session start. The full text lives in memory for
//! the session's duration; every 30 s it is saved to a `.partial` sibling so
//! a crash loses at most that window, and the final save replaces it with
//! the finished transcript.

use crate::defaults;
use crate::error::{Result, StenogramError};
use crate::pipeline::events::{EventSink, SessionEvent};
use crate::transcript::Segment;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Formats the offset between two instants as `HH:MM:SS`.
pub fn format_elapsed(start: DateTime<Utc>, at: DateTime<Utc>) -> String {
    let secs = (at - start).num_seconds().max(0);
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

/// Streams closed segments into `<session>.txt`.
pub struct TranscriptWriter {
    path: PathBuf,
    partial_path: PathBuf,
    session_start: DateTime<Utc>,
    header: String,
    lines: Vec<String>,
    last_partial_save: Instant,
    events: Arc<dyn EventSink>,
}

impl TranscriptWriter {
    pub fn new(
        path: &Path,
        session_id: &str,
        session_start: DateTime<Utc>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        let header = format!(
            "Transcript: {session_id}\nStarted: {}\n{}\n\n",
            session_start.format("%Y-%m-%d %H:%M:%S UTC"),
            "=".repeat(60),
        );
        Self {
            path: path.to_path_buf(),
            partial_path: path.with_extension("txt.partial"),
            session_start,
            header,
            lines: Vec::new(),
            last_partial_save: Instant::now(),
            events,
        }
    }

    /// Appends one closed segment, saving a `.partial` copy when the save
    /// interval elapsed.
    pub fn append(&mut self, segment: &Segment) -> Result<()> {
        self.lines.push(format!(
            "[{}] {}",
            format_elapsed(self.session_start, segment.start),
            segment.text
        ));

        if self.last_partial_save.elapsed().as_secs() >= defaults::PARTIAL_SAVE_INTERVAL_SECS {
            self.save_partial()?;
        }
        Ok(())
    }

    /// Writes the current transcript to the `.partial` sibling.
    pub fn save_partial(&mut self) -> Result<()> {
        let contents = format!("{}{}\n", self.header, self.lines.join("\n"));
        self.write_with_retry(&self.partial_path.clone(), &contents)?;
        self.last_partial_save = Instant::now();
        Ok(())
    }

    /// Writes the finished transcript with its footer and removes the
    /// `.partial` sibling. Failure here is fatal to the session.
    pub fn finalize(&mut self, ended_at: DateTime<Utc>, word_count: usize) -> Result<PathBuf> {
        let footer = format!(
            "\n{}\nSegments: {}\nWords: {}\nDuration: {}\n",
            "-".repeat(60),
            self.lines.len(),
            word_count,
            format_elapsed(self.session_start, ended_at),
        );
        let contents = format!("{}{}\n{}", self.header, self.lines.join("\n"), footer);
        self.write_with_retry(&self.path.clone(), &contents)?;

        // Best effort: the final file already supersedes the partial.
        let _ = std::fs::remove_file(&self.partial_path);
        Ok(self.path.clone())
    }

    /// Number of segment lines written so far.
    pub fn segment_count(&self) -> usize {
        self.lines.len()
    }

    fn write_with_retry(&self, path: &Path, contents: &str) -> Result<()> {
        if std::fs::write(path, contents).is_ok() {
            return Ok(());
        }
        self.events.record(&SessionEvent::SinkRetried { sink: "transcript" });
        std::fs::write(path, contents).map_err(|e| StenogramError::SinkWrite {
            sink: "transcript",
            message: format!("write {}: {e}", path.display()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::events::CollectingSink;
    use chrono::Duration;

    fn segment(index: u64, text: &str, start: DateTime<Utc>, offset_secs: i64) -> Segment {
        Segment {
            index,
            text: text.to_string(),
            start: start + Duration::seconds(offset_secs),
            end: start + Duration::seconds(offset_secs + 1),
        }
    }

    #[test]
    fn test_format_elapsed() {
        let start = Utc::now();
        assert_eq!(format_elapsed(start, start), "00:00:00");
        assert_eq!(format_elapsed(start, start + Duration::seconds(75)), "00:01:15");
        assert_eq!(format_elapsed(start, start + Duration::seconds(3661)), "01:01:01");
        // A clock step backwards never produces a negative offset.
        assert_eq!(format_elapsed(start, start - Duration::seconds(5)), "00:00:00");
    }

    #[test]
    fn test_finalized_transcript_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session_test.txt");
        let start = Utc::now();
        let events = Arc::new(CollectingSink::new());

        let mut writer = TranscriptWriter::new(&path, "session_test", start, events);
        writer.append(&segment(0, "hello world", start, 2)).unwrap();
        writer.append(&segment(1, "second segment", start, 65)).unwrap();
        let written = writer.finalize(start + Duration::seconds(120), 4).unwrap();

        let contents = std::fs::read_to_string(&written).unwrap();
        assert!(contents.starts_with("Transcript: session_test\n"));
        assert!(contents.contains("[00:00:02] hello world"));
        assert!(contents.contains("[00:01:05] second segment"));
        assert!(contents.contains("Segments: 2"));
        assert!(contents.contains("Words: 4"));
        assert!(contents.contains("Duration: 00:02:00"));

        // Lines appear in segment order.
        let first = contents.find("hello world").unwrap();
        let second = contents.find("second segment").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_partial_save_and_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session_test.txt");
        let start = Utc::now();
        let events = Arc::new(CollectingSink::new());

        let mut writer = TranscriptWriter::new(&path, "session_test", start, events);
        writer.append(&segment(0, "in progress", start, 1)).unwrap();
        writer.save_partial().unwrap();

        let partial = path.with_extension("txt.partial");
        assert!(partial.exists());
        let contents = std::fs::read_to_string(&partial).unwrap();
        assert!(contents.contains("in progress"));

        writer.finalize(start + Duration::seconds(10), 2).unwrap();
        assert!(!partial.exists(), "partial removed after the final save");
        assert!(path.exists());
    }

    #[test]
    fn test_write_failure_records_retry() {
        let events = Arc::new(CollectingSink::new());
        let start = Utc::now();
        let mut writer = TranscriptWriter::new(
            Path::new("/nonexistent/dir/out.txt"),
            "session_test",
            start,
            events.clone(),
        );
        writer.append(&segment(0, "text", start, 0)).unwrap();

        let result = writer.finalize(start, 1);
        assert!(matches!(result, Err(StenogramError::SinkWrite { .. })));
        assert_eq!(
            events.count_matching(|e| matches!(e, SessionEvent::SinkRetried { .. })),
            1
        );
    }
}
