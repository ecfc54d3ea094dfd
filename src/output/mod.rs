//! Session output sinks: transcript, summaries, metadata, and the log.

pub mod metadata;
pub mod session_log;
pub mod summary_writer;
pub mod transcript_writer;

pub use metadata::SessionMetadata;
pub use session_log::SessionLog;
pub use summary_writer::SummaryWriter;
pub use transcript_writer::{format_elapsed, TranscriptWriter};
