//! Summary file sink: one titled section per summarization cycle.

use crate::error::{Result, StenogramError};
use crate::pipeline::events::{EventSink, SessionEvent, SummaryTrigger};
use chrono::{DateTime, Utc};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Appends summary sections to `<session>_summary.txt`.
///
/// The file is created on the first write, so sessions that never produce a
/// summary leave no empty file behind.
pub struct SummaryWriter {
    path: PathBuf,
    sections_written: usize,
    events: Arc<dyn EventSink>,
}

impl SummaryWriter {
    pub fn new(path: &Path, events: Arc<dyn EventSink>) -> Self {
        Self {
            path: path.to_path_buf(),
            sections_written: 0,
            events,
        }
    }

    /// Appends one summary section.
    pub fn append(&mut self, trigger: SummaryTrigger, at: DateTime<Utc>, text: &str) -> Result<()> {
        let title = match trigger {
            SummaryTrigger::Interval => "Interval summary",
            SummaryTrigger::SessionEnd => "Final summary",
        };
        let section = format!(
            "{} ({})\n{}\n{}\n\n",
            title,
            at.format("%Y-%m-%d %H:%M:%S UTC"),
            "-".repeat(40),
            text.trim(),
        );

        self.append_with_retry(&section)?;
        self.sections_written += 1;
        Ok(())
    }

    /// Number of sections written so far.
    pub fn sections_written(&self) -> usize {
        self.sections_written
    }

    /// The sink path, or None when nothing was ever written.
    pub fn written_path(&self) -> Option<PathBuf> {
        (self.sections_written > 0).then(|| self.path.clone())
    }

    fn append_with_retry(&self, section: &str) -> Result<()> {
        if self.try_append(section).is_ok() {
            return Ok(());
        }
        self.events.record(&SessionEvent::SinkRetried { sink: "summary" });
        self.try_append(section).map_err(|e| StenogramError::SinkWrite {
            sink: "summary",
            message: format!("append {}: {e}", self.path.display()),
        })
    }

    fn try_append(&self, section: &str) -> std::io::Result<()> {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(section.as_bytes())
    }
}
