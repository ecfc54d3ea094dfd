//! Default configuration constants for stenogram.
//!
//! Shared across the configuration types and the CLI so the two never
//! disagree about what an unset option means.

/// Default audio sample rate in Hz.
///
/// 16kHz is the standard for speech recognition and what the small Vosk
/// models are trained on.
pub const SAMPLE_RATE: u32 = 16_000;

/// Default number of capture channels (mono).
pub const CHANNELS: u16 = 1;

/// Default capture block duration in milliseconds.
///
/// 500ms per block keeps partial hypotheses responsive without flooding the
/// recognizer with tiny buffers.
pub const BLOCK_DURATION_MS: u32 = 500;

/// Default bounded queue capacity between capture and recognition, in blocks.
///
/// 8 blocks at the default block duration is about four seconds of audio.
/// When the recognizer falls further behind than this, the oldest block is
/// dropped so capture never stalls.
pub const QUEUE_CAPACITY_BLOCKS: usize = 8;

/// Default directory for session output folders.
pub const SAVE_DIR: &str = "recordings";

/// Default number of sentences in an extractive summary.
pub const EXTRACTIVE_SENTENCES: usize = 5;

/// Default automatic summary interval in seconds (0 = disabled).
pub const AUTO_SUMMARY_INTERVAL_SECONDS: u64 = 0;

/// Minimum transcript length, in characters, worth summarizing.
///
/// Below this the summarizer reports `InsufficientInput` and the cycle is
/// skipped.
pub const MIN_SUMMARY_INPUT_CHARS: usize = 50;

/// Interval between periodic partial transcript saves, in seconds.
///
/// A crash mid-session loses at most this much transcript.
pub const PARTIAL_SAVE_INTERVAL_SECS: u64 = 30;

/// Capture thread polling interval in milliseconds.
///
/// How often the capture loop drains the backend's sample buffer while
/// waiting for enough samples to complete a block.
pub const CAPTURE_POLL_INTERVAL_MS: u64 = 16;

/// Interval between live console status lines, in seconds.
pub const STATUS_INTERVAL_SECS: u64 = 10;

/// Consumer-side queue pop timeout in milliseconds.
///
/// Bounds how long the recognition thread can go without observing a
/// shutdown request.
pub const QUEUE_POP_TIMEOUT_MS: u64 = 100;
