//! Session audio archive as a 16-bit PCM mono WAV file.

use crate::error::{Result, StenogramError};
use std::path::{Path, PathBuf};

/// Streams session audio into a WAV file alongside the transcript.
///
/// Samples are appended block by block; `finalize` patches the RIFF header
/// and must be called before the file is usable.
pub struct SessionWavWriter {
    writer: hound::WavWriter<std::io::BufWriter<std::fs::File>>,
    path: PathBuf,
    samples_written: u64,
    sample_rate: u32,
}

impl SessionWavWriter {
    /// Creates the WAV file at `path` for mono 16-bit PCM at `sample_rate`.
    pub fn create(path: &Path, sample_rate: u32) -> Result<Self> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let writer = hound::WavWriter::create(path, spec).map_err(|e| {
            StenogramError::SinkWrite {
                sink: "audio",
                message: format!("create {}: {e}", path.display()),
            }
        })?;
        Ok(Self {
            writer,
            path: path.to_path_buf(),
            samples_written: 0,
            sample_rate,
        })
    }

    /// Appends a block of samples.
    pub fn write_samples(&mut self, samples: &[i16]) -> Result<()> {
        for &sample in samples {
            self.writer
                .write_sample(sample)
                .map_err(|e| StenogramError::SinkWrite {
                    sink: "audio",
                    message: format!("write {}: {e}", self.path.display()),
                })?;
        }
        self.samples_written += samples.len() as u64;
        Ok(())
    }

    /// Recorded duration so far, in whole seconds.
    pub fn duration_secs(&self) -> u64 {
        self.samples_written / self.sample_rate as u64
    }

    /// Flushes and patches the RIFF header. The writer is consumed.
    pub fn finalize(self) -> Result<()> {
        self.writer
            .finalize()
            .map_err(|e| StenogramError::SinkWrite {
                sink: "audio",
                message: format!("finalize {}: {e}", self.path.display()),
            })
    }
}
