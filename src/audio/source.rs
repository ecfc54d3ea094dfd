//! Audio source abstraction and fixed-duration block assembly.

use crate::error::Result;
use crate::pipeline::types::AudioBlock;
use chrono::Utc;

/// Trait for audio capture backends.
///
/// `read_samples` is non-blocking and returns whatever the backend captured
/// since the last call (mono, 16-bit PCM at the configured rate). The
/// capture loop polls it and assembles fixed-duration blocks.
pub trait AudioSource: Send {
    /// Starts capturing.
    fn start(&mut self) -> Result<()>;

    /// Stops capturing and releases the device.
    fn stop(&mut self) -> Result<()>;

    /// Drains captured samples. Empty when nothing arrived yet.
    fn read_samples(&mut self) -> Result<Vec<i16>>;
}

/// Assembles backend reads into exact-size [`AudioBlock`]s.
///
/// Blocks carry a monotonic sequence number and a wall-clock timestamp taken
/// at block completion. Partial blocks are never emitted; a trailing
/// remainder at shutdown is discarded.
#[derive(Debug)]
pub struct BlockAssembler {
    block_samples: usize,
    pending: Vec<i16>,
    next_sequence: u64,
}

impl BlockAssembler {
    /// Creates an assembler emitting blocks of `block_samples` samples.
    pub fn new(block_samples: usize) -> Self {
        assert!(block_samples > 0, "block size must be non-zero");
        Self {
            block_samples,
            pending: Vec::with_capacity(block_samples),
            next_sequence: 0,
        }
    }

    /// Feeds captured samples, returning every block they complete.
    pub fn push(&mut self, samples: &[i16]) -> Vec<AudioBlock> {
        self.pending.extend_from_slice(samples);

        let mut blocks = Vec::new();
        while self.pending.len() >= self.block_samples {
            let rest = self.pending.split_off(self.block_samples);
            let full = std::mem::replace(&mut self.pending, rest);
            blocks.push(AudioBlock::new(full, self.next_sequence, Utc::now()));
            self.next_sequence += 1;
        }
        blocks
    }

    /// Number of samples buffered toward the next block.
    pub fn pending_samples(&self) -> usize {
        self.pending.len()
    }

    /// Total number of complete blocks emitted so far.
    pub fn blocks_emitted(&self) -> u64 {
        self.next_sequence
    }
}

/// Downmixes interleaved stereo to mono by averaging channel pairs.
pub fn downmix_stereo(samples: &[i16]) -> Vec<i16> {
    samples
        .chunks_exact(2)
        .map(|pair| ((pair[0] as i32 + pair[1] as i32) / 2) as i16)
        .collect()
}

/// Mock audio source for tests: replays scripted sample chunks.
#[derive(Debug, Default)]
pub struct MockAudioSource {
    chunks: std::collections::VecDeque<(std::time::Duration, Vec<i16>)>,
    started: bool,
    stopped: bool,
    fail_on_start: bool,
}

impl MockAudioSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk returned by one `read_samples` call.
    pub fn with_chunk(mut self, samples: Vec<i16>) -> Self {
        self.chunks.push_back((std::time::Duration::ZERO, samples));
        self
    }

    /// Appends `count` copies of the same chunk.
    pub fn with_repeated_chunk(mut self, samples: Vec<i16>, count: usize) -> Self {
        for _ in 0..count {
            self.chunks
                .push_back((std::time::Duration::ZERO, samples.clone()));
        }
        self
    }

    /// Appends a chunk whose `read_samples` call blocks for `delay` first,
    /// for exercising reads that complete during shutdown.
    pub fn with_delayed_chunk(mut self, delay: std::time::Duration, samples: Vec<i16>) -> Self {
        self.chunks.push_back((delay, samples));
        self
    }

    /// Makes `start` fail, for device-unavailable paths.
    pub fn with_start_failure(mut self) -> Self {
        self.fail_on_start = true;
        self
    }

    pub fn was_stopped(&self) -> bool {
        self.stopped
    }
}

impl AudioSource for MockAudioSource {
    fn start(&mut self) -> Result<()> {
        if self.fail_on_start {
            return Err(crate::error::StenogramError::DeviceUnavailable {
                device: "mock".to_string(),
            });
        }
        self.started = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.stopped = true;
        Ok(())
    }

    fn read_samples(&mut self) -> Result<Vec<i16>> {
        match self.chunks.pop_front() {
            Some((delay, samples)) => {
                if !delay.is_zero() {
                    std::thread::sleep(delay);
                }
                Ok(samples)
            }
            None => Ok(Vec::new()),
        }
    }
}
