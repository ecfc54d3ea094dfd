//! Microphone capture using CPAL.
//!
//! Captures 16-bit PCM mono at the configured rate. Tries the preferred
//! format first, then falls back to the device's native config with software
//! conversion (channel downmix + resampling).

use crate::audio::source::{downmix_stereo, AudioSource};
use crate::error::{Result, StenogramError};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Run a closure with stderr temporarily redirected to /dev/null.
///
/// Suppresses noisy ALSA/JACK/PipeWire messages that CPAL triggers when
/// probing audio backends. The messages are harmless but confusing to users.
///
/// # Safety
/// Uses `libc::dup`/`libc::dup2` to save and restore file descriptor 2
/// (stderr). Safe as long as no other thread is concurrently manipulating
/// fd 2.
fn with_suppressed_stderr<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    unsafe {
        let saved_fd = libc::dup(2);
        let devnull = libc::open(c"/dev/null".as_ptr(), libc::O_WRONLY);
        if saved_fd >= 0 && devnull >= 0 {
            libc::dup2(devnull, 2);
            libc::close(devnull);
        }

        let result = f();

        if saved_fd >= 0 {
            libc::dup2(saved_fd, 2);
            libc::close(saved_fd);
        }

        result
    }
}

/// Device names preferred when no device is configured. PipeWire and
/// PulseAudio follow the desktop's input selection.
const PREFERRED_DEVICES: &[&str] = &["pipewire", "pulse"];

/// Device name patterns that are never useful for speech capture.
const FILTERED_PATTERNS: &[&str] = &[
    "surround", "front:", "rear:", "center:", "side:", "hdmi", "s/pdif",
];

fn should_filter_device(name: &str) -> bool {
    let lower = name.to_lowercase();
    FILTERED_PATTERNS.iter().any(|p| lower.contains(p))
}

fn is_preferred_device(name: &str) -> bool {
    let lower = name.to_lowercase();
    PREFERRED_DEVICES.iter().any(|p| lower.contains(p))
}

/// List usable audio input devices, marking preferred ones.
///
/// Filters out channel splits and digital outputs that can never serve as a
/// microphone.
pub fn list_devices() -> Result<Vec<String>> {
    let devices = with_suppressed_stderr(|| cpal::default_host().input_devices());
    let devices = devices.map_err(|e| StenogramError::AudioCapture {
        message: format!("failed to enumerate input devices: {e}"),
    })?;

    let mut names = Vec::new();
    for device in devices {
        if let Ok(name) = device.name() {
            if should_filter_device(&name) {
                continue;
            }
            if is_preferred_device(&name) {
                names.push(format!("{name} [recommended]"));
            } else {
                names.push(name);
            }
        }
    }
    Ok(names)
}

/// Find the input device matching `name` by case-insensitive substring, or
/// the best default when `name` is `None`.
fn find_device(name: Option<&str>) -> Result<cpal::Device> {
    with_suppressed_stderr(|| {
        let host = cpal::default_host();

        if let Some(wanted) = name {
            let wanted_lower = wanted.to_lowercase();
            let devices = host
                .input_devices()
                .map_err(|e| StenogramError::AudioCapture {
                    message: format!("failed to enumerate input devices: {e}"),
                })?;
            for device in devices {
                if let Ok(device_name) = device.name() {
                    if device_name.to_lowercase().contains(&wanted_lower) {
                        return Ok(device);
                    }
                }
            }
            return Err(StenogramError::DeviceUnavailable {
                device: wanted.to_string(),
            });
        }

        // No device configured: prefer PipeWire/PulseAudio, which respect the
        // desktop's input selection, then fall back to the system default.
        if let Ok(devices) = host.input_devices() {
            for device in devices {
                if let Ok(device_name) = device.name() {
                    if is_preferred_device(&device_name) {
                        return Ok(device);
                    }
                }
            }
        }
        host.default_input_device()
            .ok_or_else(|| StenogramError::DeviceUnavailable {
                device: "default".to_string(),
            })
    })
}

/// Wrapper for cpal::Stream to make it Send.
///
/// SAFETY: the stream is only touched from the thread that owns the
/// `CpalAudioSource`; start/stop/read are never called concurrently.
struct SendableStream(cpal::Stream);

unsafe impl Send for SendableStream {}

/// Microphone capture via CPAL.
///
/// The stream callback appends converted samples to a shared buffer; the
/// capture loop drains it through `read_samples`.
pub struct CpalAudioSource {
    device: cpal::Device,
    stream: Option<SendableStream>,
    buffer: Arc<Mutex<Vec<i16>>>,
    callback_count: Arc<AtomicU64>,
    sample_rate: u32,
    channels: u16,
}

impl CpalAudioSource {
    /// Opens the named device (case-insensitive substring match) or the best
    /// default when `device_name` is `None`. Fails with `DeviceUnavailable`
    /// when nothing matches.
    pub fn new(device_name: Option<&str>, sample_rate: u32, channels: u16) -> Result<Self> {
        let device = find_device(device_name)?;
        Ok(Self {
            device,
            stream: None,
            buffer: Arc::new(Mutex::new(Vec::new())),
            callback_count: Arc::new(AtomicU64::new(0)),
            sample_rate,
            channels,
        })
    }

    /// The resolved device name, for logging.
    pub fn device_name(&self) -> String {
        self.device.name().unwrap_or_else(|_| "unknown".to_string())
    }

    /// Build a stream at the preferred config (requested rate/channels).
    fn build_stream(&self) -> Result<cpal::Stream> {
        let preferred_config = cpal::StreamConfig {
            channels: self.channels,
            sample_rate: cpal::SampleRate(self.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };
        let channels = self.channels as usize;

        let err_callback = |err| {
            eprintln!("audio stream error: {err}");
        };

        // i16 first: PipeWire/PulseAudio convert transparently.
        let buffer = Arc::clone(&self.buffer);
        let counter = Arc::clone(&self.callback_count);
        if let Ok(stream) = self.device.build_input_stream(
            &preferred_config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                counter.fetch_add(1, Ordering::Relaxed);
                let mono = to_mono(data, channels);
                if let Ok(mut buf) = buffer.lock() {
                    buf.extend_from_slice(&mono);
                }
            },
            err_callback,
            None,
        ) {
            return Ok(stream);
        }

        // f32 for devices that only expose float formats.
        let buffer = Arc::clone(&self.buffer);
        let counter = Arc::clone(&self.callback_count);
        if let Ok(stream) = self.device.build_input_stream(
            &preferred_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                counter.fetch_add(1, Ordering::Relaxed);
                let i16_data: Vec<i16> = data.iter().map(|&s| f32_to_i16(s)).collect();
                let mono = to_mono(&i16_data, channels);
                if let Ok(mut buf) = buffer.lock() {
                    buf.extend_from_slice(&mono);
                }
            },
            err_callback,
            None,
        ) {
            return Ok(stream);
        }

        self.build_stream_native()
    }

    /// Build a stream at the device's native config, with software downmix
    /// and resampling. Some PipeWire-ALSA setups accept non-native configs
    /// but never deliver data, so this is the fallback path.
    fn build_stream_native(&self) -> Result<cpal::Stream> {
        use cpal::SampleFormat;

        let default_config =
            self.device
                .default_input_config()
                .map_err(|e| StenogramError::AudioCapture {
                    message: format!("failed to query default input config: {e}"),
                })?;

        let native_rate = default_config.sample_rate().0;
        let native_channels = default_config.channels() as usize;
        let target_rate = self.sample_rate;
        let stream_config: cpal::StreamConfig = default_config.clone().into();

        let err_callback = |err| {
            eprintln!("audio stream error: {err}");
        };

        let buffer = Arc::clone(&self.buffer);
        let counter = Arc::clone(&self.callback_count);

        match default_config.sample_format() {
            SampleFormat::I16 => self
                .device
                .build_input_stream(
                    &stream_config,
                    move |data: &[i16], _: &cpal::InputCallbackInfo| {
                        counter.fetch_add(1, Ordering::Relaxed);
                        let converted =
                            convert_native(data, native_channels, native_rate, target_rate);
                        if let Ok(mut buf) = buffer.lock() {
                            buf.extend_from_slice(&converted);
                        }
                    },
                    err_callback,
                    None,
                )
                .map_err(|e| StenogramError::AudioCapture {
                    message: format!("failed to build native i16 stream: {e}"),
                }),
            SampleFormat::F32 => self
                .device
                .build_input_stream(
                    &stream_config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        counter.fetch_add(1, Ordering::Relaxed);
                        let i16_data: Vec<i16> = data.iter().map(|&s| f32_to_i16(s)).collect();
                        let converted =
                            convert_native(&i16_data, native_channels, native_rate, target_rate);
                        if let Ok(mut buf) = buffer.lock() {
                            buf.extend_from_slice(&converted);
                        }
                    },
                    err_callback,
                    None,
                )
                .map_err(|e| StenogramError::AudioCapture {
                    message: format!("failed to build native f32 stream: {e}"),
                }),
            fmt => Err(StenogramError::AudioCapture {
                message: format!("unsupported native sample format {fmt:?}"),
            }),
        }
    }
}

impl AudioSource for CpalAudioSource {
    fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let stream = self.build_stream()?;
        stream.play().map_err(|e| StenogramError::AudioCapture {
            message: format!("failed to start audio stream: {e}"),
        })?;

        // Check that the callback actually fires. Some PipeWire-ALSA setups
        // accept non-native configs but never deliver data.
        std::thread::sleep(std::time::Duration::from_millis(200));

        let final_stream = if self.callback_count.load(Ordering::Relaxed) == 0 {
            drop(stream);
            if let Ok(mut buf) = self.buffer.lock() {
                buf.clear();
            }
            let native = self.build_stream_native()?;
            native.play().map_err(|e| StenogramError::AudioCapture {
                message: format!("failed to start native audio stream: {e}"),
            })?;
            native
        } else {
            stream
        };

        self.stream = Some(SendableStream(final_stream));
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            stream.0.pause().map_err(|e| StenogramError::AudioCapture {
                message: format!("failed to stop audio stream: {e}"),
            })?;
        }
        Ok(())
    }

    fn read_samples(&mut self) -> Result<Vec<i16>> {
        let mut buffer = self.buffer.lock().map_err(|e| StenogramError::AudioCapture {
            message: format!("failed to lock audio buffer: {e}"),
        })?;
        Ok(std::mem::take(&mut *buffer))
    }
}

fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

fn to_mono(samples: &[i16], channels: usize) -> Vec<i16> {
    match channels {
        1 => samples.to_vec(),
        2 => downmix_stereo(samples),
        n => samples
            .chunks_exact(n)
            .map(|frame| {
                let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                (sum / n as i32) as i16
            })
            .collect(),
    }
}

/// Downmix to mono and resample from the device's native rate.
fn convert_native(samples: &[i16], channels: usize, source_rate: u32, target_rate: u32) -> Vec<i16> {
    let mono = to_mono(samples, channels);
    if source_rate == target_rate {
        mono
    } else {
        resample(&mono, source_rate, target_rate)
    }
}

/// Linear interpolation resampling. Good enough for speech recognition.
pub fn resample(samples: &[i16], from_rate: u32, to_rate: u32) -> Vec<i16> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;

    (0..output_len)
        .map(|i| {
            let source_pos = i as f64 * ratio;
            let source_idx = source_pos.floor() as usize;
            let fraction = source_pos - source_idx as f64;

            if source_idx + 1 >= samples.len() {
                samples[samples.len() - 1]
            } else {
                let left = samples[source_idx] as f64;
                let right = samples[source_idx + 1] as f64;
                (left + (right - left) * fraction) as i16
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_filter_device() {
        assert!(should_filter_device("surround51"));
        assert!(should_filter_device("front:CARD=PCH"));
        assert!(should_filter_device("HDMI Output"));
        assert!(!should_filter_device("pipewire"));
        assert!(!should_filter_device("Built-in Audio"));
    }

    #[test]
    fn test_is_preferred_device() {
        assert!(is_preferred_device("pipewire"));
        assert!(is_preferred_device("PulseAudio"));
        assert!(!is_preferred_device("hw:0,0"));
        assert!(!is_preferred_device("default"));
    }

    #[test]
    fn test_f32_to_i16_clamps() {
        assert_eq!(f32_to_i16(0.0), 0);
        assert_eq!(f32_to_i16(1.0), i16::MAX);
        assert_eq!(f32_to_i16(2.0), i16::MAX);
        assert_eq!(f32_to_i16(-2.0), -i16::MAX);
    }

    #[test]
    fn test_to_mono_passthrough_and_downmix() {
        assert_eq!(to_mono(&[1, 2, 3], 1), vec![1, 2, 3]);
        assert_eq!(to_mono(&[100, 200, 300, 400], 2), vec![150, 350]);
        assert_eq!(to_mono(&[30, 60, 90], 3), vec![60]);
    }

    #[test]
    fn test_resample_identity() {
        let samples = vec![100i16, 200, 300];
        assert_eq!(resample(&samples, 16_000, 16_000), samples);
    }

    #[test]
    fn test_resample_halves_and_doubles() {
        let down = resample(&[0i16; 3200], 16_000, 8_000);
        assert_eq!(down.len(), 1600);

        let up = resample(&[0i16, 1000, 2000], 8_000, 16_000);
        assert_eq!(up.len(), 6);
        assert_eq!(up[0], 0);
        assert!(up[1] > 0 && up[1] < 1000);
        assert_eq!(up[2], 1000);
    }

    #[test]
    fn test_resample_empty() {
        assert!(resample(&[], 16_000, 8_000).is_empty());
    }

    #[test]
    fn test_unknown_device_is_unavailable() {
        let result = CpalAudioSource::new(Some("NoSuchMicrophone12345"), 16_000, 1);
        assert!(matches!(
            result,
            Err(StenogramError::DeviceUnavailable { .. })
        ));
    }

    #[test]
    #[ignore] // Requires audio hardware
    fn test_capture_from_default_device() {
        let mut source = CpalAudioSource::new(None, 16_000, 1).expect("open default device");
        source.start().expect("start capture");
        std::thread::sleep(std::time::Duration::from_millis(100));
        let samples = source.read_samples().expect("read samples");
        let _ = samples;
        source.stop().expect("stop capture");
    }
}
