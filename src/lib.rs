//! stenogram - Offline meeting and lecture transcription
//!
//! Captures microphone audio, transcribes it locally with Vosk, and writes
//! timestamped transcripts with periodic and end-of-session summaries.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod session;
pub mod stt;
pub mod summary;
pub mod transcript;

// Core traits (source → recognize → aggregate → sink)
pub use audio::AudioSource;
pub use pipeline::events::EventSink;
pub use stt::Recognizer;
pub use summary::Summarizer;

// Session orchestration
pub use session::{SessionContext, SessionManager, SessionOutcome};

// Error handling
pub use error::{Result, StenogramError};

// Config
pub use config::{Config, SummaryMode};
