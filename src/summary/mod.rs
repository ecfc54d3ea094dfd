//! Summarization: the summarizer trait and its implementations.
//!
//! The pipeline treats summarization as an external collaborator: the
//! extractive and abstractive modes are semantically interchangeable, and a
//! failed summarization never ends the session.

pub mod extractive;

#[cfg(feature = "abstractive")]
pub mod abstractive;

use crate::config::{Config, SummaryMode};
use crate::error::{Result, StenogramError};
use std::sync::{Arc, Mutex};

pub use extractive::ExtractiveSummarizer;

/// Trait for text summarization.
pub trait Summarizer: Send + Sync {
    /// Summarizes a text span into a shorter text.
    ///
    /// Fails with `InsufficientInput` when there is too little text to
    /// summarize; callers skip the cycle and continue.
    fn summarize(&self, text: &str) -> Result<String>;

    /// Mode name for logging and metadata.
    fn mode(&self) -> &'static str;
}

/// Builds the summarizer selected by the configuration.
///
/// When the abstractive mode is requested but the crate was built without
/// the `abstractive` feature, falls back to extractive and reports the
/// substitution so the caller can log it — the session still runs.
pub fn build_summarizer(config: &Config) -> (Arc<dyn Summarizer>, Option<String>) {
    match config.summary.mode {
        SummaryMode::Extractive => (
            Arc::new(ExtractiveSummarizer::new(config.summary.extractive_sentences)),
            None,
        ),
        SummaryMode::Abstractive => {
            #[cfg(feature = "abstractive")]
            {
                match abstractive::AbstractiveSummarizer::load() {
                    Ok(summarizer) => return (Arc::new(summarizer), None),
                    Err(e) => {
                        return (
                            Arc::new(ExtractiveSummarizer::new(
                                config.summary.extractive_sentences,
                            )),
                            Some(format!(
                                "abstractive summarizer unavailable ({e}), using extractive"
                            )),
                        );
                    }
                }
            }
            #[cfg(not(feature = "abstractive"))]
            (
                Arc::new(ExtractiveSummarizer::new(config.summary.extractive_sentences)),
                Some(
                    "built without the abstractive feature, using extractive summarizer"
                        .to_string(),
                ),
            )
        }
    }
}

/// Mock summarizer for tests: records every input and returns a canned
/// response.
#[derive(Default)]
pub struct MockSummarizer {
    calls: Mutex<Vec<String>>,
    response: String,
    fail: bool,
}

impl MockSummarizer {
    pub fn new(response: &str) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            response: response.to_string(),
            fail: false,
        }
    }

    /// Configures the mock to fail with `InsufficientInput`.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new("")
        }
    }

    /// All inputs passed to `summarize` so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("mock lock poisoned").clone()
    }
}

impl Summarizer for MockSummarizer {
    fn summarize(&self, text: &str) -> Result<String> {
        self.calls
            .lock()
            .expect("mock lock poisoned")
            .push(text.to_string());
        if self.fail {
            Err(StenogramError::InsufficientInput {
                message: "mock summarizer failure".to_string(),
            })
        } else {
            Ok(self.response.clone())
        }
    }

    fn mode(&self) -> &'static str {
        "mock"
    }
}
