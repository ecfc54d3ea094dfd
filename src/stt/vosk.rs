//! Vosk-based streaming speech recognition.
//!
//! Wraps the Kaldi-based Vosk decoder, which emits partial results while an
//! utterance is in progress and a final result when the decoder closes it.
//!
//! # Feature Gate
//!
//! This module requires the `vosk-stt` feature and libvosk available at link
//! time. Build with:
//!
//! ```bash
//! cargo build --features vosk-stt
//! ```

use crate::error::{Result, StenogramError};
use crate::stt::recognizer::{RawHypothesis, Recognizer};
use std::path::{Path, PathBuf};

#[cfg(feature = "vosk-stt")]
use vosk::{CompleteResult, DecodingState, Model};

/// Configuration for the Vosk recognizer.
#[derive(Debug, Clone)]
pub struct VoskConfig {
    /// Path to the unpacked Vosk model directory.
    pub model_path: PathBuf,
    /// Sample rate of the PCM the pipeline will feed (Hz).
    pub sample_rate: u32,
}

/// Vosk recognizer implementation.
///
/// # Feature Gate
///
/// The real decoder is only available with the `vosk-stt` feature; without
/// it this type exists but fails at construction with a clear message.
pub struct VoskRecognizer {
    #[cfg(feature = "vosk-stt")]
    recognizer: vosk::Recognizer,
    model_name: String,
    /// Text of the last partial we emitted; repeated identical partials are
    /// suppressed so the aggregator only sees refinements.
    #[cfg(feature = "vosk-stt")]
    last_partial: String,
}

impl std::fmt::Debug for VoskRecognizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoskRecognizer")
            .field("model_name", &self.model_name)
            .finish_non_exhaustive()
    }
}

/// Checks that a Vosk model directory exists before anything is loaded.
///
/// Used by startup validation so a missing model fails before the audio
/// device is opened.
pub fn check_model_dir(path: &Path) -> Result<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(StenogramError::ModelNotFound {
            path: path.display().to_string(),
        })
    }
}

#[cfg(feature = "vosk-stt")]
impl VoskRecognizer {
    /// Loads the model and creates a streaming recognizer.
    ///
    /// # Errors
    /// Returns `ModelNotFound` if the model directory is missing and
    /// `RecognitionUnavailable` if the model or recognizer fails to load.
    pub fn new(config: VoskConfig) -> Result<Self> {
        check_model_dir(&config.model_path)?;

        let model_name = config
            .model_path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string();

        let model = Model::new(config.model_path.to_string_lossy()).ok_or_else(|| {
            StenogramError::RecognitionUnavailable {
                message: format!(
                    "failed to load Vosk model from {}",
                    config.model_path.display()
                ),
            }
        })?;

        let mut recognizer = vosk::Recognizer::new(&model, config.sample_rate as f32)
            .ok_or_else(|| StenogramError::RecognitionUnavailable {
                message: "failed to create Vosk recognizer".to_string(),
            })?;
        recognizer.set_words(true);

        Ok(Self {
            recognizer,
            model_name,
            last_partial: String::new(),
        })
    }

    fn take_final(last_partial: &mut String, result: CompleteResult) -> Option<RawHypothesis> {
        last_partial.clear();
        let text = match result {
            CompleteResult::Single(single) => single.text.trim().to_string(),
            CompleteResult::Multiple(multi) => multi
                .alternatives
                .first()
                .map(|alt| alt.text.trim().to_string())
                .unwrap_or_default(),
        };
        // An empty Final still closes the utterance window.
        Some(RawHypothesis::Final(text))
    }
}

#[cfg(feature = "vosk-stt")]
impl Recognizer for VoskRecognizer {
    fn accept(&mut self, pcm: &[i16]) -> Result<Option<RawHypothesis>> {
        match self.recognizer.accept_waveform(pcm) {
            DecodingState::Finalized => {
                let result = self.recognizer.result();
                Ok(Self::take_final(&mut self.last_partial, result))
            }
            DecodingState::Running => {
                let partial = self.recognizer.partial_result().partial.trim().to_string();
                if partial.is_empty() || partial == self.last_partial {
                    return Ok(None);
                }
                self.last_partial = partial.clone();
                Ok(Some(RawHypothesis::Partial(partial)))
            }
            DecodingState::Failed => Err(StenogramError::RecognitionUnavailable {
                message: "Vosk decoder failed on waveform".to_string(),
            }),
        }
    }

    fn finalize(&mut self) -> Result<Option<RawHypothesis>> {
        let result = self.recognizer.final_result();
        let hypothesis = Self::take_final(&mut self.last_partial, result);
        match hypothesis {
            Some(RawHypothesis::Final(text)) if !text.is_empty() => {
                Ok(Some(RawHypothesis::Final(text)))
            }
            _ => Ok(None),
        }
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(not(feature = "vosk-stt"))]
impl VoskRecognizer {
    /// Stub constructor for builds without the `vosk-stt` feature.
    pub fn new(_config: VoskConfig) -> Result<Self> {
        Err(StenogramError::RecognitionUnavailable {
            message: "stenogram was built without the vosk-stt feature".to_string(),
        })
    }
}

#[cfg(not(feature = "vosk-stt"))]
impl Recognizer for VoskRecognizer {
    fn accept(&mut self, _pcm: &[i16]) -> Result<Option<RawHypothesis>> {
        Err(StenogramError::RecognitionUnavailable {
            message: "stenogram was built without the vosk-stt feature".to_string(),
        })
    }

    fn finalize(&mut self) -> Result<Option<RawHypothesis>> {
        Ok(None)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
