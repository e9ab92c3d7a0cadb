//! `AudioEngine`: top-level lifecycle controller.
//!
//! ## Lifecycle
//!
//! ```text
//! AudioEngine::new(device)
//!     └─► initialize(rate, latency)  → ring allocated, device open, rate live, unpaused
//!         ├─► produce() / consume()  → cursors advance
//!         ├─► pause(mode)            → device paused/resumed
//!         ├─► reset()                → cursors rewound, ring zeroed, rate kept
//!         └─► shutdown()             → device closed, ring released, rate = 0
//! ```
//!
//! `initialize` always shuts down the previous session first, so calling it
//! again is safe. Every failure leaves the engine uninitialized and silent:
//! `initialize` returns `0`, `try_initialize` returns the reason.
//!
//! ## Threading
//!
//! The engine is driven from the producer's thread. The device callback only
//! sees a `PlaybackHandle`. `reset` and `shutdown` wait for an in-flight
//! callback through the ring's gate; the callback never waits for them.

pub mod diagnostics;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    audio::{AudioDevice, DeviceSpec, PlaybackHandle},
    buffering::{Sample, SampleRing},
    error::{AudioError, Result},
};

use diagnostics::{DiagnosticsSnapshot, EngineDiagnostics};

/// Lowest accepted sampling rate (Hz).
pub const MIN_SAMPLE_RATE: u32 = 8_000;

/// Configuration for `AudioEngine`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct EngineConfig {
    /// Requested sampling rate (Hz). Default: 44100.
    pub sample_rate: u32,
    /// Latency budget (ms), sizes the ring. Default: 100.
    pub latency_ms: u32,
    /// Preferred output device name. `None` uses the system default.
    pub output_device: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            latency_ms: 100,
            output_device: None,
        }
    }
}

impl EngineConfig {
    /// Ring capacity for this config: `rate * latency / 1000`, truncated.
    pub fn ring_capacity(&self) -> Option<usize> {
        ring_capacity(self.sample_rate, self.latency_ms)
    }
}

fn ring_capacity(rate: u32, latency_ms: u32) -> Option<usize> {
    usize::try_from(u64::from(rate) * u64::from(latency_ms) / 1000).ok()
}

/// What `AudioEngine::pause` should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseMode {
    Resume,
    Pause,
    Toggle,
}

/// The top-level engine handle.
pub struct AudioEngine<D: AudioDevice> {
    device: D,
    /// `Some` between a successful initialize and shutdown.
    ring: Option<Arc<SampleRing>>,
    device_open: bool,
    paused: bool,
    diagnostics: Arc<EngineDiagnostics>,
}

impl<D: AudioDevice> AudioEngine<D> {
    /// Create an uninitialized (silent) engine around `device`.
    pub fn new(device: D) -> Self {
        Self {
            device,
            ring: None,
            device_open: false,
            paused: false,
            diagnostics: Arc::new(EngineDiagnostics::default()),
        }
    }

    /// Start a session. Returns the effective rate, or `0` for silent mode.
    ///
    /// Callers must treat the return value, not their request, as the rate.
    pub fn initialize(&mut self, rate: u32, latency_ms: u32) -> u32 {
        match self.try_initialize(rate, latency_ms) {
            Ok(effective) => effective,
            Err(e) => {
                warn!("audio disabled, running silent: {e}");
                0
            }
        }
    }

    /// `initialize` from an `EngineConfig`.
    pub fn initialize_with(&mut self, config: &EngineConfig) -> u32 {
        self.initialize(config.sample_rate, config.latency_ms)
    }

    /// Start a session, reporting why it failed.
    ///
    /// # Errors
    /// - `AudioError::InvalidConfig` for `rate < 8000` or `latency_ms == 0`.
    /// - `AudioError::Allocation` if the ring cannot be allocated.
    /// - Any device error from open or resume.
    ///
    /// The engine is uninitialized after any error.
    pub fn try_initialize(&mut self, rate: u32, latency_ms: u32) -> Result<u32> {
        self.shutdown();

        if rate < MIN_SAMPLE_RATE || latency_ms == 0 {
            return Err(AudioError::InvalidConfig { rate, latency_ms });
        }

        let capacity = ring_capacity(rate, latency_ms).ok_or(AudioError::Allocation {
            capacity: usize::MAX,
        })?;
        self.diagnostics.reset();
        let ring = Arc::new(SampleRing::allocate(
            capacity,
            Arc::clone(&self.diagnostics),
        )?);

        let spec = DeviceSpec::stereo16(rate, capacity);
        self.device
            .open(spec, PlaybackHandle::new(Arc::clone(&ring)))?;
        self.device_open = true;

        // The callback must never see a live rate over an unready ring.
        ring.reset();
        ring.activate(rate);
        self.ring = Some(ring);

        if let Err(e) = self.device.set_paused(false) {
            self.shutdown();
            return Err(e);
        }
        self.paused = false;

        info!(rate, latency_ms, capacity, "audio engine initialized");
        Ok(rate)
    }

    /// Stop the device, release the ring and zero all state.
    ///
    /// Safe to call when already uninitialized.
    pub fn shutdown(&mut self) {
        if let Some(ring) = self.ring.take() {
            ring.deactivate();
        }
        if self.device_open {
            self.device.close();
            self.device_open = false;
            info!("audio engine shut down");
        }
        self.paused = false;
    }

    /// Enqueue freshly rendered mono samples. Returns how many were written.
    ///
    /// A short count is backpressure: the ring is full and the rest of `data`
    /// was not taken. This never blocks.
    pub fn produce(&mut self, data: &[Sample]) -> usize {
        let Some(ring) = self.ring.as_ref() else {
            return 0;
        };
        let written = ring.produce(data);
        if written < data.len() {
            debug!(dropped = data.len() - written, "ring full, short write");
        }
        written
    }

    /// Drain interleaved stereo frames into `out` from the caller's thread.
    ///
    /// Same contract as the device callback: never blocks, zero-fills when
    /// uninitialized, repeats the last sample on underrun. Must not race the
    /// device's own callback.
    pub fn consume(&self, out: &mut [Sample]) {
        match self.ring.as_ref() {
            Some(ring) => ring.consume_interleaved(out, 2),
            None => out.fill(0),
        }
    }

    /// Free slots in the ring, `0` when uninitialized.
    pub fn available_capacity(&self) -> usize {
        self.ring.as_ref().map_or(0, |ring| ring.free_slots())
    }

    /// Samples written but not yet played.
    pub fn queued_samples(&self) -> usize {
        self.ring.as_ref().map_or(0, |ring| ring.queued())
    }

    /// Playback time covered by `queued_samples`.
    pub fn queued_duration(&self) -> Duration {
        match self.rate() {
            0 => Duration::ZERO,
            rate => Duration::from_secs_f64(self.queued_samples() as f64 / f64::from(rate)),
        }
    }

    /// Pause, resume or toggle playback. Returns the resulting paused state.
    ///
    /// The device is only touched on an actual change. If it refuses, the
    /// stored state is left as it was.
    pub fn pause(&mut self, mode: PauseMode) -> bool {
        let target = match mode {
            PauseMode::Resume => false,
            PauseMode::Pause => true,
            PauseMode::Toggle => !self.paused,
        };

        if target != self.paused {
            if self.device_open {
                if let Err(e) = self.device.set_paused(target) {
                    warn!("failed to switch playback pause to {target}: {e}");
                    return self.paused;
                }
            }
            self.paused = target;
            debug!(paused = target, "playback pause switched");
        }

        self.paused
    }

    /// Discard buffered audio: rewind both cursors and zero the ring.
    ///
    /// Rate, capacity and pause state are kept.
    pub fn reset(&mut self) {
        if let Some(ring) = self.ring.as_ref() {
            ring.reset();
            debug!("audio ring reset");
        }
    }

    /// Effective rate (Hz), `0` when uninitialized.
    pub fn rate(&self) -> u32 {
        self.ring.as_ref().map_or(0, |ring| ring.rate())
    }

    /// Ring capacity in samples, `0` when uninitialized.
    pub fn capacity(&self) -> usize {
        self.ring.as_ref().map_or(0, |ring| ring.capacity())
    }

    pub fn is_initialized(&self) -> bool {
        self.rate() != 0
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Snapshot of producer/consumer counters for observability.
    pub fn diagnostics_snapshot(&self) -> DiagnosticsSnapshot {
        self.diagnostics.snapshot()
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }
}

impl<D: AudioDevice> Drop for AudioEngine<D> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
