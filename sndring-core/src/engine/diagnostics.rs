//! Lock-free counters shared by the producer and the playback callback.
//!
//! All updates are `Relaxed` `fetch_add`s, cheap enough for the real-time path.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Default)]
pub struct EngineDiagnostics {
    pub samples_written: AtomicU64,
    pub samples_dropped: AtomicU64,
    pub frames_played: AtomicU64,
    pub underrun_frames: AtomicU64,
    pub silent_callbacks: AtomicU64,
}

impl EngineDiagnostics {
    pub fn reset(&self) {
        self.samples_written.store(0, Ordering::Relaxed);
        self.samples_dropped.store(0, Ordering::Relaxed);
        self.frames_played.store(0, Ordering::Relaxed);
        self.underrun_frames.store(0, Ordering::Relaxed);
        self.silent_callbacks.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            samples_written: self.samples_written.load(Ordering::Relaxed),
            samples_dropped: self.samples_dropped.load(Ordering::Relaxed),
            frames_played: self.frames_played.load(Ordering::Relaxed),
            underrun_frames: self.underrun_frames.load(Ordering::Relaxed),
            silent_callbacks: self.silent_callbacks.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn record_write(&self, written: usize, dropped: usize) {
        self.samples_written
            .fetch_add(written as u64, Ordering::Relaxed);
        if dropped > 0 {
            self.samples_dropped
                .fetch_add(dropped as u64, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_playback(&self, frames: usize, underruns: usize) {
        self.frames_played.fetch_add(frames as u64, Ordering::Relaxed);
        if underruns > 0 {
            self.underrun_frames
                .fetch_add(underruns as u64, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_silent_callback(&self) {
        self.silent_callbacks.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsSnapshot {
    pub samples_written: u64,
    pub samples_dropped: u64,
    pub frames_played: u64,
    pub underrun_frames: u64,
    /// Callbacks answered with silence (engine inert or mid-reset).
    pub silent_callbacks: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_zeroes_every_counter() {
        let diagnostics = EngineDiagnostics::default();
        diagnostics.record_write(10, 2);
        diagnostics.record_playback(4, 1);
        diagnostics.record_silent_callback();
        assert_ne!(diagnostics.snapshot(), DiagnosticsSnapshot::default());

        diagnostics.reset();
        assert_eq!(diagnostics.snapshot(), DiagnosticsSnapshot::default());
    }

    #[test]
    fn snapshot_serializes_camel_case() {
        let diagnostics = EngineDiagnostics::default();
        diagnostics.record_write(3, 0);
        let json = serde_json::to_value(diagnostics.snapshot()).unwrap();
        assert_eq!(json["samplesWritten"], 3);
        assert_eq!(json["underrunFrames"], 0);
    }
}
