//! Transcript aggregation and snapshots.

pub mod aggregator;

pub use aggregator::{Segment, TranscriptAggregator, TranscriptSnapshot};
