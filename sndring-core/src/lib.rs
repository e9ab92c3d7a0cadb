//! # sndring-core
//!
//! Real-time audio streaming engine for emulators.
//!
//! ## Architecture
//!
//! ```text
//! Emulation loop ──produce()──► SampleRing ◄──consume()── driver callback
//!  (variable cadence)          (fixed capacity,          (fixed cadence,
//!                               two wrapping cursors)     never blocks)
//! ```
//!
//! The producer owns the write cursor, the consumer owns the read cursor.
//! Mono samples are duplicated across both output channels on the way out.
//! The consume path is allocation-free and never blocks.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod audio;
pub mod buffering;
pub mod engine;
pub mod error;

// Convenience re-exports for downstream crates
pub use audio::{AudioDevice, DeviceSpec, NullDevice, PlaybackHandle};
pub use buffering::{ByteOrder, Sample};
pub use engine::{
    diagnostics::{DiagnosticsSnapshot, EngineDiagnostics},
    AudioEngine, EngineConfig, PauseMode,
};
pub use error::AudioError;

#[cfg(feature = "audio-cpal")]
pub use audio::output::CpalOutput;
