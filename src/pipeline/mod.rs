//! The capture-to-summary pipeline: shared types, the block queue, the
//! recognition adapter, events, and the summary scheduler.

pub mod adapter;
pub mod block_queue;
pub mod events;
pub mod scheduler;
pub mod types;

pub use adapter::RecognitionAdapter;
pub use block_queue::BlockQueue;
pub use events::{
    CollectingSink, EventSink, FanoutSink, SessionEvent, ShutdownToken, StderrReporter,
    SummaryTrigger,
};
pub use scheduler::SummaryScheduler;
pub use types::{AudioBlock, Hypothesis, HypothesisKind};
