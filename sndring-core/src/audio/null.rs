//! Headless device: accepts every request and never calls back.
//!
//! Hosts without a sound card (tests, benchmarks, recording front-ends) pull
//! audio themselves through `AudioEngine::consume` or the kept handle.

use tracing::debug;

use super::{AudioDevice, DeviceSpec, PlaybackHandle};
use crate::error::Result;

#[derive(Default)]
pub struct NullDevice {
    spec: Option<DeviceSpec>,
    handle: Option<PlaybackHandle>,
    paused: bool,
}

impl NullDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spec of the currently open stream, if any.
    pub fn spec(&self) -> Option<DeviceSpec> {
        self.spec
    }

    /// Handle given at open time, for pulling audio by hand.
    pub fn handle(&self) -> Option<&PlaybackHandle> {
        self.handle.as_ref()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }
}

impl AudioDevice for NullDevice {
    fn open(&mut self, spec: DeviceSpec, handle: PlaybackHandle) -> Result<()> {
        debug!(sample_rate = spec.sample_rate, "null device opened");
        self.spec = Some(spec);
        self.handle = Some(handle);
        self.paused = true;
        Ok(())
    }

    fn set_paused(&mut self, paused: bool) -> Result<()> {
        self.paused = paused;
        Ok(())
    }

    fn close(&mut self) {
        self.spec = None;
        self.handle = None;
        self.paused = false;
    }
}
