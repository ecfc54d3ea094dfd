//! Speech-to-text: the recognizer trait and its implementations.

pub mod recognizer;
pub mod vosk;

pub use recognizer::{RawHypothesis, Recognizer, ScriptedRecognizer};
pub use vosk::{check_model_dir, VoskConfig, VoskRecognizer};
