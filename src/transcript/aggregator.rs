//! Transcript aggregation: the single source of truth for what has been
//! said so far.
//!
//! The aggregator reconciles the partial/final hypothesis stream into an
//! append-only segment log. It runs a small state machine per utterance
//! window (the span between two Final hypotheses): Idle while no segment is
//! open, Pending while partials refine the open segment's text. Partials
//! replace the open text wholesale; only a Final closes a segment.

use crate::pipeline::types::{Hypothesis, HypothesisKind};
use chrono::{DateTime, Utc};

/// A closed, immutable unit of the transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Sequentially assigned index; strictly increasing across the session.
    pub index: u64,
    pub text: String,
    /// Wall-clock time of the first hypothesis in this utterance window.
    pub start: DateTime<Utc>,
    /// Wall-clock time of the closing Final.
    pub end: DateTime<Utc>,
}

/// The open segment awaiting its Final.
#[derive(Debug, Clone)]
struct OpenSegment {
    text: String,
    start: DateTime<Utc>,
}

/// Read-only view of the transcript, safe to hold without blocking the
/// aggregator.
#[derive(Debug, Clone, Default)]
pub struct TranscriptSnapshot {
    /// All segments closed so far, in index order.
    pub segments: Vec<Segment>,
    /// Best-effort text of the open segment, if one exists.
    pub open_text: Option<String>,
}

impl TranscriptSnapshot {
    /// Closed-segment text joined with spaces (summarizer input).
    pub fn closed_text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Reconciles hypothesis events into the segment log.
///
/// Exclusively owned and mutated by the recognition thread; everything else
/// reads [`TranscriptSnapshot`]s.
#[derive(Debug, Default)]
pub struct TranscriptAggregator {
    closed: Vec<Segment>,
    open: Option<OpenSegment>,
    next_index: u64,
}

impl TranscriptAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one hypothesis at the current wall-clock time.
    ///
    /// Returns the newly closed segment, if this hypothesis closed one, so
    /// the caller can stream it to the transcript sink.
    pub fn apply(&mut self, hypothesis: &Hypothesis) -> Option<Segment> {
        self.apply_at(hypothesis, Utc::now())
    }

    /// Applies one hypothesis at an explicit timestamp (testable core).
    pub fn apply_at(&mut self, hypothesis: &Hypothesis, now: DateTime<Utc>) -> Option<Segment> {
        match hypothesis.kind {
            HypothesisKind::Partial => {
                let text = hypothesis.text.trim();
                // Empty partials carry no information; they never open a
                // window and never erase a pending refinement.
                if text.is_empty() {
                    return None;
                }
                match &mut self.open {
                    // Partials are full-utterance-so-far: replace, never
                    // concatenate.
                    Some(open) => open.text = text.to_string(),
                    None => {
                        self.open = Some(OpenSegment {
                            text: text.to_string(),
                            start: now,
                        });
                    }
                }
                None
            }
            HypothesisKind::Final => {
                let text = hypothesis.text.trim();
                let open = self.open.take();
                if text.is_empty() {
                    // No speech in this window; discard the open segment.
                    return None;
                }
                let start = open.map(|o| o.start).unwrap_or(now);
                Some(self.close_segment(text.to_string(), start, now))
            }
        }
    }

    /// Force-closes the open segment at session end using its last partial
    /// text as a synthetic Final.
    ///
    /// Returns the closed segment, or None when there was no open segment or
    /// it held no text.
    pub fn force_close(&mut self) -> Option<Segment> {
        self.force_close_at(Utc::now())
    }

    /// Force-close at an explicit timestamp (testable core).
    pub fn force_close_at(&mut self, now: DateTime<Utc>) -> Option<Segment> {
        let open = self.open.take()?;
        if open.text.trim().is_empty() {
            return None;
        }
        Some(self.close_segment(open.text, open.start, now))
    }

    /// Immutable copy of the transcript for readers.
    pub fn snapshot(&self) -> TranscriptSnapshot {
        TranscriptSnapshot {
            segments: self.closed.clone(),
            open_text: self.open.as_ref().map(|o| o.text.clone()),
        }
    }

    /// Number of closed segments.
    pub fn segment_count(&self) -> usize {
        self.closed.len()
    }

    /// Approximate word count across closed segments.
    pub fn word_count(&self) -> usize {
        self.closed
            .iter()
            .map(|s| s.text.split_whitespace().count())
            .sum()
    }

    /// True while an utterance window is open.
    pub fn has_open_segment(&self) -> bool {
        self.open.is_some()
    }

    fn close_segment(&mut self, text: String, start: DateTime<Utc>, end: DateTime<Utc>) -> Segment {
        let segment = Segment {
            index: self.next_index,
            text,
            start,
            end,
        };
        self.next_index += 1;
        self.closed.push(segment.clone());
        segment
    }
}
