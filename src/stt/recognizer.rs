//! Speech recognizer abstraction.
//!
//! The pipeline only ever sees this trait; the real Vosk implementation and
//! the scripted test double are interchangeable behind it.

use crate::error::Result;

/// A raw recognizer result before the adapter tags it with block sequence
/// numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawHypothesis {
    /// Provisional full-utterance-so-far text.
    Partial(String),
    /// Closing text for the current utterance window.
    Final(String),
}

impl RawHypothesis {
    /// The hypothesis text, whichever kind it is.
    pub fn text(&self) -> &str {
        match self {
            RawHypothesis::Partial(t) | RawHypothesis::Final(t) => t,
        }
    }
}

/// Trait for incremental speech-to-text recognition.
///
/// Implementations must emit partial results before an utterance's Final and
/// deliver results in order. A recognizer that emits incremental deltas must
/// normalize them into full-so-far text before returning.
pub trait Recognizer: Send {
    /// Feeds one block of PCM samples (16-bit mono at the configured rate).
    ///
    /// Returns at most one hypothesis per block: a Partial while the
    /// utterance is still open, or a Final once the decoder closes it.
    fn accept(&mut self, pcm: &[i16]) -> Result<Option<RawHypothesis>>;

    /// Flushes any pending result at end of session.
    ///
    /// Returns the recognizer's last Final, if it was still holding text.
    fn finalize(&mut self) -> Result<Option<RawHypothesis>>;

    /// Name of the loaded model, for logging and metadata.
    fn model_name(&self) -> &str;
}

/// Scripted recognizer for tests: replays a fixed sequence of responses,
/// one per `accept` call.
#[derive(Debug, Default)]
pub struct ScriptedRecognizer {
    script: std::collections::VecDeque<Result<Option<RawHypothesis>>>,
    flush: Option<RawHypothesis>,
    accepted_blocks: usize,
}

impl ScriptedRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a partial hypothesis to the script.
    pub fn then_partial(mut self, text: &str) -> Self {
        self.script
            .push_back(Ok(Some(RawHypothesis::Partial(text.to_string()))));
        self
    }

    /// Appends a final hypothesis to the script.
    pub fn then_final(mut self, text: &str) -> Self {
        self.script
            .push_back(Ok(Some(RawHypothesis::Final(text.to_string()))));
        self
    }

    /// Appends a silent block (no hypothesis) to the script.
    pub fn then_silence(mut self) -> Self {
        self.script.push_back(Ok(None));
        self
    }

    /// Appends a decode failure to the script.
    pub fn then_failure(mut self, message: &str) -> Self {
        self.script
            .push_back(Err(crate::error::StenogramError::RecognitionUnavailable {
                message: message.to_string(),
            }));
        self
    }

    /// Sets the hypothesis returned by `finalize`.
    pub fn with_flush(mut self, hypothesis: RawHypothesis) -> Self {
        self.flush = Some(hypothesis);
        self
    }

    /// Number of blocks fed so far.
    pub fn accepted_blocks(&self) -> usize {
        self.accepted_blocks
    }
}

impl Recognizer for ScriptedRecognizer {
    fn accept(&mut self, _pcm: &[i16]) -> Result<Option<RawHypothesis>> {
        self.accepted_blocks += 1;
        // Past the end of the script every block is silence.
        self.script.pop_front().unwrap_or(Ok(None))
    }

    fn finalize(&mut self) -> Result<Option<RawHypothesis>> {
        Ok(self.flush.take())
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}
