//! Playback device interface.
//!
//! The engine talks to the platform through `AudioDevice`: open a stream for a
//! `DeviceSpec`, pause/resume it, close it. On open the device receives a
//! `PlaybackHandle`, the consumer-side view of the ring, and calls one of its
//! `consume*` methods from the driver callback.
//!
//! # Threading note
//!
//! `cpal::Stream` is `!Send` on most platforms (COM on Windows, CoreAudio on
//! macOS), so `AudioDevice` carries no `Send` bound. An engine holding a
//! `CpalOutput` must be created and dropped on the same thread.

pub mod device;
pub mod null;
#[cfg(feature = "audio-cpal")]
pub mod output;

use std::sync::Arc;

use crate::{
    buffering::{ByteOrder, Sample, SampleRing},
    error::Result,
};

pub use null::NullDevice;

/// Stream parameters the engine asks a device for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceSpec {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    pub byte_order: ByteOrder,
    /// Hardware period in interleaved samples (all channels).
    pub period_samples: usize,
}

impl DeviceSpec {
    /// 16-bit big-endian stereo with one ring's worth of frames per period.
    pub fn stereo16(sample_rate: u32, ring_capacity: usize) -> Self {
        Self {
            sample_rate,
            channels: 2,
            bits_per_sample: 16,
            byte_order: ByteOrder::BigEndian,
            period_samples: ring_capacity * 2,
        }
    }

    /// Hardware period in frames.
    pub fn period_frames(&self) -> usize {
        self.period_samples / usize::from(self.channels.max(1))
    }
}

/// Platform playback device.
pub trait AudioDevice {
    /// Open a stream for `spec` whose callback drains `handle`.
    ///
    /// The stream may start paused; the engine resumes it once the ring is
    /// live. Any earlier stream is replaced.
    ///
    /// # Errors
    /// Device negotiation or stream construction failure. This is the only
    /// error the engine propagates from a device.
    fn open(&mut self, spec: DeviceSpec, handle: PlaybackHandle) -> Result<()>;

    /// Pause (`true`) or resume (`false`) the open stream.
    fn set_paused(&mut self, paused: bool) -> Result<()>;

    /// Stop and release the stream. No-op when nothing is open.
    fn close(&mut self);
}

/// Consumer-side view of the ring handed to a driver callback.
///
/// Cloning is cheap. Only one clone may consume at a time; drivers invoke one
/// callback at a time, which satisfies this.
#[derive(Clone)]
pub struct PlaybackHandle {
    ring: Arc<SampleRing>,
}

impl PlaybackHandle {
    pub(crate) fn new(ring: Arc<SampleRing>) -> Self {
        Self { ring }
    }

    /// Fill interleaved stereo `out`, duplicating each mono sample.
    #[inline]
    pub fn consume(&self, out: &mut [Sample]) {
        self.ring.consume_interleaved(out, 2);
    }

    /// Fill interleaved `out` with `channels` copies of each mono sample.
    #[inline]
    pub fn consume_interleaved(&self, out: &mut [Sample], channels: usize) {
        self.ring.consume_interleaved(out, channels);
    }

    /// Fill a raw byte stream with 16-bit stereo frames in `order`.
    #[inline]
    pub fn consume_bytes(&self, out: &mut [u8], order: ByteOrder) {
        self.ring.consume_bytes(out, order);
    }

    /// `false` while the engine is initializing, shut down or silent.
    pub fn is_live(&self) -> bool {
        self.ring.is_live()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stereo16_period_is_one_ring_of_frames() {
        let spec = DeviceSpec::stereo16(44_100, 4410);
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(spec.byte_order, ByteOrder::BigEndian);
        assert_eq!(spec.period_samples, 8820);
        assert_eq!(spec.period_frames(), 4410);
    }
}
