//! Recognition adapter: block stream in, hypothesis events out.
//!
//! Purely a format/lifecycle adapter. It forwards PCM to the recognizer,
//! normalizes raw results, and tags them with the feeding block's sequence
//! number. It holds no transcript state.

use crate::error::Result;
use crate::pipeline::types::{AudioBlock, Hypothesis};
use crate::stt::recognizer::{RawHypothesis, Recognizer};

/// Adapts a [`Recognizer`] into the pipeline's hypothesis event stream.
pub struct RecognitionAdapter {
    recognizer: Box<dyn Recognizer>,
    /// Sequence of the last block fed, used to tag the finalize flush.
    last_sequence: u64,
}

impl RecognitionAdapter {
    pub fn new(recognizer: Box<dyn Recognizer>) -> Self {
        Self {
            recognizer,
            last_sequence: 0,
        }
    }

    /// Feeds one block and returns the normalized hypotheses it produced.
    ///
    /// Recognizer failure is fatal to the session: there is no fallback
    /// decoder, so the error propagates unchanged.
    pub fn feed(&mut self, block: &AudioBlock) -> Result<Vec<Hypothesis>> {
        self.last_sequence = block.sequence;
        let raw = self.recognizer.accept(&block.samples)?;
        Ok(raw
            .into_iter()
            .map(|r| Self::normalize(r, block.sequence))
            .collect())
    }

    /// Flushes the recognizer's pending result at session end.
    pub fn finalize(&mut self) -> Result<Option<Hypothesis>> {
        let raw = self.recognizer.finalize()?;
        Ok(raw.map(|r| Self::normalize(r, self.last_sequence)))
    }

    /// Name of the underlying model.
    pub fn model_name(&self) -> &str {
        self.recognizer.model_name()
    }

    fn normalize(raw: RawHypothesis, block_sequence: u64) -> Hypothesis {
        match raw {
            RawHypothesis::Partial(text) => {
                Hypothesis::partial(text.trim().to_string(), block_sequence)
            }
            RawHypothesis::Final(text) => {
                Hypothesis::final_(text.trim().to_string(), block_sequence)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::HypothesisKind;
    use crate::stt::recognizer::ScriptedRecognizer;
    use chrono::Utc;

    fn block(sequence: u64) -> AudioBlock {
        AudioBlock::new(vec![0i16; 8], sequence, Utc::now())
    }

    #[test]
    fn test_feed_tags_block_sequence() {
        let rec = ScriptedRecognizer::new()
            .then_partial("hello")
            .then_final("hello world");
        let mut adapter = RecognitionAdapter::new(Box::new(rec));

        let hyps = adapter.feed(&block(3)).unwrap();
        assert_eq!(hyps.len(), 1);
        assert_eq!(hyps[0].kind, HypothesisKind::Partial);
        assert_eq!(hyps[0].block_sequence, 3);

        let hyps = adapter.feed(&block(4)).unwrap();
        assert_eq!(hyps[0].kind, HypothesisKind::Final);
        assert_eq!(hyps[0].block_sequence, 4);
    }

    #[test]
    fn test_silent_blocks_produce_no_events() {
        let rec = ScriptedRecognizer::new().then_silence().then_silence();
        let mut adapter = RecognitionAdapter::new(Box::new(rec));

        assert!(adapter.feed(&block(0)).unwrap().is_empty());
        assert!(adapter.feed(&block(1)).unwrap().is_empty());
    }

    #[test]
    fn test_normalize_trims_whitespace() {
        let rec = ScriptedRecognizer::new().then_partial("  hello  ");
        let mut adapter = RecognitionAdapter::new(Box::new(rec));

        let hyps = adapter.feed(&block(0)).unwrap();
        assert_eq!(hyps[0].text, "hello");
    }

    #[test]
    fn test_finalize_tags_last_fed_sequence() {
        let rec = ScriptedRecognizer::new()
            .then_silence()
            .with_flush(RawHypothesis::Final("tail".into()));
        let mut adapter = RecognitionAdapter::new(Box::new(rec));

        adapter.feed(&block(9)).unwrap();
        let flushed = adapter.finalize().unwrap().unwrap();
        assert!(flushed.is_final());
        assert_eq!(flushed.text, "tail");
        assert_eq!(flushed.block_sequence, 9);
    }

    #[test]
    fn test_recognizer_failure_propagates() {
        let rec = ScriptedRecognizer::new().then_failure("decode exception");
        let mut adapter = RecognitionAdapter::new(Box::new(rec));

        let err = adapter.feed(&block(0)).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("decode exception"));
    }
}
