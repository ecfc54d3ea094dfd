//! Session log sink (`<session>_log.txt`).
//!
//! Implements [`EventSink`], so every pipeline event lands here as a
//! `[timestamp] [LEVEL] message` line. Write failures are swallowed: the log
//! is the last resort and has nowhere to report its own problems.

use crate::pipeline::events::{EventSink, SessionEvent};
use chrono::Utc;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub struct SessionLog {
    file: Mutex<BufWriter<File>>,
    error_count: AtomicUsize,
}

impl SessionLog {
    /// Creates the log file, truncating any previous content.
    pub fn create(path: &Path) -> std::io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            file: Mutex::new(BufWriter::new(file)),
            error_count: AtomicUsize::new(0),
        })
    }

    /// Number of ERROR-level events recorded.
    pub fn error_count(&self) -> usize {
        self.error_count.load(Ordering::Relaxed)
    }

    /// Flushes buffered lines to disk.
    pub fn flush(&self) {
        if let Ok(mut file) = self.file.lock() {
            let _ = file.flush();
        }
    }
}

impl EventSink for SessionLog {
    fn record(&self, event: &SessionEvent) {
        // Live console events arrive many times per second and belong on
        // the terminal, not in the log.
        if matches!(
            event,
            SessionEvent::PartialHypothesis { .. } | SessionEvent::Status { .. }
        ) {
            return;
        }
        if event.level() == "ERROR" {
            self.error_count.fetch_add(1, Ordering::Relaxed);
        }
        let line = format!(
            "[{}] [{}] {}\n",
            Utc::now().format("%Y-%m-%d %H:%M:%S"),
            event.level(),
            event.message(),
        );
        if let Ok(mut file) = self.file.lock() {
            let _ = file.write_all(line.as_bytes());
            // Flushed per line so a crash keeps everything already logged.
            let _ = file.flush();
        }
    }
}
