//! Data types flowing through the capture-to-transcript pipeline.

use chrono::{DateTime, Utc};

/// A fixed-duration block of PCM samples produced by the capture thread.
///
/// Blocks are created complete and never mutated: the capture thread fills
/// them, the recognition thread consumes and discards them.
#[derive(Debug, Clone)]
pub struct AudioBlock {
    /// PCM samples (16-bit signed, mono).
    pub samples: Vec<i16>,
    /// Monotonic sequence number for ordering and drop accounting.
    pub sequence: u64,
    /// Wall-clock time at block completion.
    pub captured_at: DateTime<Utc>,
}

impl AudioBlock {
    /// Creates a new audio block.
    pub fn new(samples: Vec<i16>, sequence: u64, captured_at: DateTime<Utc>) -> Self {
        Self {
            samples,
            sequence,
            captured_at,
        }
    }

    /// Block duration in milliseconds at the given sample rate.
    pub fn duration_ms(&self, sample_rate: u32) -> u64 {
        if sample_rate == 0 {
            return 0;
        }
        self.samples.len() as u64 * 1000 / sample_rate as u64
    }
}

/// The kind of a recognizer hypothesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HypothesisKind {
    /// Provisional full-utterance-so-far text, superseded by later
    /// hypotheses for the same utterance window.
    Partial,
    /// Irrevocable closing text for the current utterance window.
    Final,
}

/// A normalized recognizer output event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hypothesis {
    pub kind: HypothesisKind,
    /// Transcribed text, possibly empty (a Final with empty text means the
    /// window contained no speech).
    pub text: String,
    /// Sequence number of the last audio block this hypothesis reflects.
    pub block_sequence: u64,
}

impl Hypothesis {
    /// Creates a partial hypothesis.
    pub fn partial(text: impl Into<String>, block_sequence: u64) -> Self {
        Self {
            kind: HypothesisKind::Partial,
            text: text.into(),
            block_sequence,
        }
    }

    /// Creates a final hypothesis.
    pub fn final_(text: impl Into<String>, block_sequence: u64) -> Self {
        Self {
            kind: HypothesisKind::Final,
            text: text.into(),
            block_sequence,
        }
    }

    /// True if this hypothesis closes an utterance window.
    pub fn is_final(&self) -> bool {
        self.kind == HypothesisKind::Final
    }
}
