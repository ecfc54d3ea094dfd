//! Session events and the sinks that record them.
//!
//! Recoverable conditions (dropped blocks, skipped summaries, sink retries)
//! never propagate as errors past their component boundary; they are recorded
//! as events so the session log is the single place they become visible.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// What triggered a summarization cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryTrigger {
    /// The configured auto-summary interval elapsed.
    Interval,
    /// The session is finalizing.
    SessionEnd,
}

impl std::fmt::Display for SummaryTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SummaryTrigger::Interval => write!(f, "interval"),
            SummaryTrigger::SessionEnd => write!(f, "session end"),
        }
    }
}

/// A structured event emitted by pipeline components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Lifecycle state transition.
    Lifecycle { state: &'static str },
    /// The block queue was full; the oldest block was evicted.
    BlockDropped { sequence: u64 },
    /// A partial hypothesis refined the open segment. Live display only;
    /// the session log ignores these.
    PartialHypothesis { text: String },
    /// Periodic progress while Running. Live display only.
    Status {
        elapsed_seconds: u64,
        segments: usize,
        dropped: u64,
    },
    /// A transcript segment was closed.
    SegmentClosed { index: u64, text: String },
    /// A summary was produced and written.
    SummaryWritten { trigger: SummaryTrigger, chars: usize },
    /// A summarization cycle was skipped (empty transcript or summarizer
    /// failure). Non-fatal.
    SummarySkipped { trigger: SummaryTrigger, reason: String },
    /// A streaming sink write failed once and is being retried.
    SinkRetried { sink: &'static str },
    /// A recoverable component error, logged and swallowed.
    RecoverableError {
        component: &'static str,
        message: String,
    },
    /// A fatal component error; the session is stopping.
    FatalError {
        component: &'static str,
        message: String,
    },
}

impl SessionEvent {
    /// Human-readable log line body for this event.
    pub fn message(&self) -> String {
        match self {
            SessionEvent::Lifecycle { state } => format!("Session state: {state}"),
            SessionEvent::BlockDropped { sequence } => {
                format!("Block queue full, dropped oldest block (seq {sequence})")
            }
            SessionEvent::PartialHypothesis { text } => format!("Partial: {text}"),
            SessionEvent::Status {
                elapsed_seconds,
                segments,
                dropped,
            } => format!(
                "Elapsed {}, {segments} segments, {dropped} dropped",
                format_hms(*elapsed_seconds)
            ),
            SessionEvent::SegmentClosed { index, text } => {
                format!("Segment {index} closed ({} chars)", text.chars().count())
            }
            SessionEvent::SummaryWritten { trigger, chars } => {
                format!("Summary written ({trigger}, {chars} chars)")
            }
            SessionEvent::SummarySkipped { trigger, reason } => {
                format!("Summary skipped ({trigger}): {reason}")
            }
            SessionEvent::SinkRetried { sink } => {
                format!("Retrying {sink} write after failure")
            }
            SessionEvent::RecoverableError { component, message } => {
                format!("{component}: {message}")
            }
            SessionEvent::FatalError { component, message } => {
                format!("{component}: {message}")
            }
        }
    }

    /// Log level for this event.
    pub fn level(&self) -> &'static str {
        match self {
            SessionEvent::Lifecycle { .. }
            | SessionEvent::PartialHypothesis { .. }
            | SessionEvent::Status { .. }
            | SessionEvent::SegmentClosed { .. }
            | SessionEvent::SummaryWritten { .. } => "INFO",
            SessionEvent::BlockDropped { .. }
            | SessionEvent::SummarySkipped { .. }
            | SessionEvent::SinkRetried { .. }
            | SessionEvent::RecoverableError { .. } => "WARNING",
            SessionEvent::FatalError { .. } => "ERROR",
        }
    }
}

/// Trait for recording session events.
pub trait EventSink: Send + Sync {
    /// Records a single event.
    fn record(&self, event: &SessionEvent);
}

/// Formats a second count as `HH:MM:SS`.
pub fn format_hms(secs: u64) -> String {
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

/// Clears the current terminal line before the cursor rewrites it.
const CLEAR_LINE: &str = "\r\x1b[2K";

/// Live console sink: partials rewrite the current line, closed segments
/// are echoed as they land, and warnings break through without corrupting
/// the in-place line. `quiet` silences everything below ERROR.
#[derive(Debug, Clone, Copy)]
pub struct StderrReporter {
    quiet: bool,
}

impl StderrReporter {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl EventSink for StderrReporter {
    fn record(&self, event: &SessionEvent) {
        if self.quiet {
            if event.level() == "ERROR" {
                eprintln!("[ERROR] {}", event.message());
            }
            return;
        }
        match event {
            SessionEvent::PartialHypothesis { text } => {
                eprint!("{CLEAR_LINE}… {text}");
            }
            SessionEvent::SegmentClosed { text, .. } => {
                eprintln!("{CLEAR_LINE}{text}");
            }
            SessionEvent::Status {
                elapsed_seconds,
                segments,
                dropped,
            } => {
                eprint!(
                    "{CLEAR_LINE}[{}] {segments} segments{}",
                    format_hms(*elapsed_seconds),
                    if *dropped > 0 {
                        format!(", {dropped} dropped")
                    } else {
                        String::new()
                    }
                );
            }
            _ => match event.level() {
                "INFO" => {}
                level => eprintln!("{CLEAR_LINE}[{level}] {}", event.message()),
            },
        }
    }
}

/// Fans an event out to several sinks.
pub struct FanoutSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        Self { sinks }
    }
}

impl EventSink for FanoutSink {
    fn record(&self, event: &SessionEvent) {
        for sink in &self.sinks {
            sink.record(event);
        }
    }
}

/// Event sink that collects events in memory (tests).
#[derive(Default)]
pub struct CollectingSink {
    events: Mutex<Vec<SessionEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded events.
    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.lock().expect("event lock poisoned").clone()
    }

    /// Number of recorded events matching a predicate.
    pub fn count_matching(&self, pred: impl Fn(&SessionEvent) -> bool) -> usize {
        self.events
            .lock()
            .expect("event lock poisoned")
            .iter()
            .filter(|e| pred(e))
            .count()
    }
}

impl EventSink for CollectingSink {
    fn record(&self, event: &SessionEvent) {
        self.events
            .lock()
            .expect("event lock poisoned")
            .push(event.clone());
    }
}

/// Cooperative cancellation token shared by all pipeline threads.
///
/// Each thread observes the token at its next suspension point (queue pop
/// timeout, capture poll, scheduler select) and unwinds, releasing its owned
/// resource. Requesting a stop is idempotent: only the first request reports
/// having initiated it.
#[derive(Debug, Clone, Default)]
pub struct ShutdownToken {
    stopped: Arc<AtomicBool>,
}

impl ShutdownToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a stop. Returns true only for the first request.
    pub fn request_stop(&self) -> bool {
        self.stopped
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// True once a stop has been requested.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_levels() {
        assert_eq!(
            SessionEvent::Lifecycle { state: "Running" }.level(),
            "INFO"
        );
        assert_eq!(SessionEvent::BlockDropped { sequence: 1 }.level(), "WARNING");
        assert_eq!(
            SessionEvent::FatalError {
                component: "recognizer",
                message: "gone".into()
            }
            .level(),
            "ERROR"
        );
    }

    #[test]
    fn test_format_hms() {
        assert_eq!(format_hms(0), "00:00:00");
        assert_eq!(format_hms(75), "00:01:15");
        assert_eq!(format_hms(3661), "01:01:01");
    }

    #[test]
    fn test_live_events_are_info_level() {
        assert_eq!(
            SessionEvent::PartialHypothesis { text: "so far".into() }.level(),
            "INFO"
        );
        assert_eq!(
            SessionEvent::Status {
                elapsed_seconds: 12,
                segments: 2,
                dropped: 0
            }
            .level(),
            "INFO"
        );
    }

    #[test]
    fn test_segment_closed_carries_text() {
        let event = SessionEvent::SegmentClosed {
            index: 3,
            text: "hello".into(),
        };
        assert!(event.message().contains("Segment 3"));
        assert!(event.message().contains("5 chars"));
    }

    #[test]
    fn test_event_messages() {
        let event = SessionEvent::BlockDropped { sequence: 42 };
        assert!(event.message().contains("seq 42"));

        let event = SessionEvent::SummarySkipped {
            trigger: SummaryTrigger::Interval,
            reason: "empty transcript".into(),
        };
        assert!(event.message().contains("interval"));
        assert!(event.message().contains("empty transcript"));
    }

    #[test]
    fn test_collecting_sink() {
        let sink = CollectingSink::new();
        sink.record(&SessionEvent::BlockDropped { sequence: 1 });
        sink.record(&SessionEvent::BlockDropped { sequence: 2 });
        sink.record(&SessionEvent::Lifecycle { state: "Running" });

        assert_eq!(sink.events().len(), 3);
        assert_eq!(
            sink.count_matching(|e| matches!(e, SessionEvent::BlockDropped { .. })),
            2
        );
    }

    #[test]
    fn test_fanout_sink() {
        let a = Arc::new(CollectingSink::new());
        let b = Arc::new(CollectingSink::new());
        let fanout = FanoutSink::new(vec![a.clone(), b.clone()]);

        fanout.record(&SessionEvent::Lifecycle { state: "Closed" });
        assert_eq!(a.events().len(), 1);
        assert_eq!(b.events().len(), 1);
    }

    #[test]
    fn test_shutdown_token_idempotent() {
        let token = ShutdownToken::new();
        assert!(!token.is_stopped());

        assert!(token.request_stop(), "first request initiates the stop");
        assert!(token.is_stopped());
        assert!(!token.request_stop(), "repeated requests are ignored");
        assert!(token.is_stopped());
    }

    #[test]
    fn test_shutdown_token_shared_across_clones() {
        let token = ShutdownToken::new();
        let clone = token.clone();
        token.request_stop();
        assert!(clone.is_stopped());
    }
}
