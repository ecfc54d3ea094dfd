//! Bounded hand-off between capture and recognition.
//!
//! The queue is the pipeline's only backpressure point. Capture can never be
//! paused without losing hardware samples, so `push` never blocks: when the
//! queue is full the oldest block is evicted and counted. Transcription
//! quality degrades locally under pressure, but the pipeline never deadlocks.

use crate::pipeline::types::AudioBlock;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Bounded FIFO of audio blocks with oldest-drop eviction.
#[derive(Clone)]
pub struct BlockQueue {
    tx: Sender<AudioBlock>,
    rx: Receiver<AudioBlock>,
    dropped: Arc<AtomicU64>,
}

impl BlockQueue {
    /// Creates a queue holding at most `capacity` blocks.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be non-zero");
        let (tx, rx) = bounded(capacity);
        Self {
            tx,
            rx,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Pushes a block, evicting the oldest queued block if full.
    ///
    /// Returns the sequence number of the evicted block, if any, so the
    /// caller can record a `BlockDropped` event.
    pub fn push(&self, block: AudioBlock) -> Option<u64> {
        let mut evicted = None;
        let mut block = block;
        loop {
            match self.tx.try_send(block) {
                Ok(()) => return evicted,
                Err(TrySendError::Full(returned)) => {
                    block = returned;
                    // Evict the oldest block to favor freshness. The consumer
                    // may race us and pop it first; either way space opens up.
                    if let Ok(old) = self.rx.try_recv() {
                        self.dropped.fetch_add(1, Ordering::SeqCst);
                        evicted = Some(old.sequence);
                    }
                }
                Err(TrySendError::Disconnected(_)) => return evicted,
            }
        }
    }

    /// Pops the next block, waiting up to `timeout`.
    ///
    /// Returns None on timeout so the consumer can observe cancellation.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<AudioBlock> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Pops without waiting. Used to drain the queue during Finalizing.
    pub fn try_pop(&self) -> Option<AudioBlock> {
        self.rx.try_recv().ok()
    }

    /// Number of blocks currently queued.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// True when no blocks are queued.
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Total number of blocks evicted under pressure so far.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::SeqCst)
    }
}
