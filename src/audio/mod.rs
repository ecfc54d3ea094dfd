//! Audio capture: the source trait, block assembly, CPAL backend, and the
//! session WAV archive.

pub mod source;
pub mod wav;

#[cfg(feature = "cpal-audio")]
pub mod capture;

pub use source::{AudioSource, BlockAssembler, MockAudioSource};
pub use wav::SessionWavWriter;

#[cfg(feature = "cpal-audio")]
pub use capture::{list_devices, CpalAudioSource};
