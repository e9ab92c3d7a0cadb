//! Audio playback via the cpal backend.
//!
//! # Design constraints
//!
//! The cpal output callback runs on an OS audio thread at elevated priority.
//! It **must not** allocate, block on a mutex, or perform I/O. The callbacks
//! below only call `PlaybackHandle::consume_interleaved`, which is lock-free,
//! plus an in-place format conversion through a scratch buffer allocated when
//! the stream is built.
//!
//! cpal always hands out native-endian samples, so a big-endian request is
//! satisfied by the backend's own conversion.

use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    BufferSize, Device, SampleFormat, SampleRate, Stream, StreamConfig,
};
use tracing::{error, info, warn};

use super::{AudioDevice, DeviceSpec, PlaybackHandle};
use crate::{
    buffering::Sample,
    error::{AudioError, Result},
};

/// Interleaved samples converted per pass for non-i16 device formats.
const SCRATCH_SAMPLES: usize = 4096;

/// cpal-backed output device.
///
/// **Not `Send`**: the stream is bound to its creation thread on Windows/macOS.
pub struct CpalOutput {
    preferred_device: Option<String>,
    stream: Option<Stream>,
}

impl CpalOutput {
    /// Use the system default output device.
    pub fn new() -> Self {
        Self::with_preference(None)
    }

    /// Prefer an output device by name, falling back to the default device
    /// and then the first available one.
    pub fn with_preference(preferred_device: Option<String>) -> Self {
        Self {
            preferred_device,
            stream: None,
        }
    }

    fn select_device(&self) -> Result<Device> {
        let host = cpal::default_host();

        if let Some(preferred_name) = self.preferred_device.as_deref() {
            match host.output_devices() {
                Ok(mut devices) => {
                    let found = devices.find(|device| {
                        device
                            .name()
                            .map(|name| name == preferred_name)
                            .unwrap_or(false)
                    });
                    match found {
                        Some(device) => return Ok(device),
                        None => warn!(
                            "preferred output device '{}' not found, falling back",
                            preferred_name
                        ),
                    }
                }
                Err(e) => {
                    warn!("failed to list output devices while resolving preference: {e}");
                }
            }
        }

        if let Some(default) = host.default_output_device() {
            return Ok(default);
        }

        let mut devices = host
            .output_devices()
            .map_err(|e| AudioError::AudioDevice(e.to_string()))?;
        let fallback = devices.next().ok_or(AudioError::NoOutputDevice)?;
        warn!("no default output device, falling back to first available output");
        Ok(fallback)
    }
}

impl Default for CpalOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioDevice for CpalOutput {
    fn open(&mut self, spec: DeviceSpec, handle: PlaybackHandle) -> Result<()> {
        self.close();

        let device = self.select_device()?;
        info!(
            device = device.name().unwrap_or_default().as_str(),
            sample_rate = spec.sample_rate,
            period_frames = spec.period_frames(),
            "opening output device"
        );

        let format = device
            .default_output_config()
            .map_err(|e| AudioError::AudioDevice(e.to_string()))?
            .sample_format();

        let period = u32::try_from(spec.period_frames()).unwrap_or(u32::MAX);
        let fixed = StreamConfig {
            channels: spec.channels,
            sample_rate: SampleRate(spec.sample_rate),
            buffer_size: BufferSize::Fixed(period),
        };

        let stream = match build_stream(&device, &fixed, format, handle.clone()) {
            Ok(stream) => stream,
            Err(e) => {
                warn!("fixed period of {period} frames rejected ({e}), using driver default");
                let fallback = StreamConfig {
                    buffer_size: BufferSize::Default,
                    ..fixed
                };
                build_stream(&device, &fallback, format, handle)?
            }
        };

        // Stay quiet until the engine has published the rate.
        if let Err(e) = stream.pause() {
            warn!("output stream cannot start paused: {e}");
        }

        self.stream = Some(stream);
        Ok(())
    }

    fn set_paused(&mut self, paused: bool) -> Result<()> {
        let Some(stream) = self.stream.as_ref() else {
            return Ok(());
        };
        if paused {
            stream
                .pause()
                .map_err(|e| AudioError::AudioStream(e.to_string()))
        } else {
            stream
                .play()
                .map_err(|e| AudioError::AudioStream(e.to_string()))
        }
    }

    fn close(&mut self) {
        // Dropping the stream stops the callback and releases the device.
        if self.stream.take().is_some() {
            info!("output stream closed");
        }
    }
}

fn build_stream(
    device: &Device,
    config: &StreamConfig,
    format: SampleFormat,
    handle: PlaybackHandle,
) -> Result<Stream> {
    let channels = usize::from(config.channels.max(1));
    // Frame-aligned so a pass never splits a frame across two consumes.
    let pass = (SCRATCH_SAMPLES / channels) * channels;

    let stream = match format {
        SampleFormat::I16 => device.build_output_stream(
            config,
            move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                handle.consume_interleaved(data, channels);
            },
            |err| error!("audio stream error: {err}"),
            None,
        ),

        SampleFormat::F32 => {
            let mut scratch: Vec<Sample> = vec![0; pass];
            device.build_output_stream(
                config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    for chunk in data.chunks_mut(pass) {
                        let samples = &mut scratch[..chunk.len()];
                        handle.consume_interleaved(samples, channels);
                        for (out, &s) in chunk.iter_mut().zip(samples.iter()) {
                            *out = f32::from(s) / 32768.0;
                        }
                    }
                },
                |err| error!("audio stream error: {err}"),
                None,
            )
        }

        SampleFormat::U16 => {
            let mut scratch: Vec<Sample> = vec![0; pass];
            device.build_output_stream(
                config,
                move |data: &mut [u16], _: &cpal::OutputCallbackInfo| {
                    for chunk in data.chunks_mut(pass) {
                        let samples = &mut scratch[..chunk.len()];
                        handle.consume_interleaved(samples, channels);
                        for (out, &s) in chunk.iter_mut().zip(samples.iter()) {
                            *out = (i32::from(s) + 32768) as u16;
                        }
                    }
                },
                |err| error!("audio stream error: {err}"),
                None,
            )
        }

        fmt => {
            return Err(AudioError::AudioStream(format!(
                "unsupported sample format: {fmt:?}"
            )))
        }
    };
    stream.map_err(|e| AudioError::AudioStream(e.to_string()))
}
