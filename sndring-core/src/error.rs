use thiserror::Error;

/// All errors produced by sndring-core.
///
/// The public `AudioEngine::initialize` contract collapses every variant into
/// a `0` return (silent mode); `try_initialize` surfaces them.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("rejected audio config: rate {rate} Hz, latency {latency_ms} ms (need >= 8000 Hz and >= 1 ms)")]
    InvalidConfig { rate: u32, latency_ms: u32 },

    #[error("could not allocate a ring of {capacity} samples")]
    Allocation { capacity: usize },

    #[error("no default output device found")]
    NoOutputDevice,

    #[error("audio device error: {0}")]
    AudioDevice(String),

    #[error("audio stream error: {0}")]
    AudioStream(String),
}

pub type Result<T> = std::result::Result<T, AudioError>;
