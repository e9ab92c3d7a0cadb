//! Persistent host settings (JSON file in the user data directory).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use sndring_core::EngineConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct AppSettings {
    pub engine: EngineConfig,
    /// Test tone pitch (Hz).
    pub tone_hz: f32,
    /// Test tone amplitude in [0, 1].
    pub volume: f32,
    /// Producer cadence, one render pass per video frame.
    pub frames_per_second: u32,
    pub run_seconds: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            tone_hz: 440.0,
            volume: 0.25,
            frames_per_second: 60,
            run_seconds: 5,
        }
    }
}

impl AppSettings {
    pub fn normalize(&mut self) {
        self.tone_hz = self.tone_hz.clamp(20.0, 8_000.0);
        self.volume = self.volume.clamp(0.0, 1.0);
        self.frames_per_second = self.frames_per_second.clamp(1, 240);
        self.engine.output_device = self
            .engine
            .output_device
            .take()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());
    }

    /// Producer passes for the whole run, capped rather than overflowing.
    pub fn total_frames(&self) -> u64 {
        self.run_seconds
            .saturating_mul(u64::from(self.frames_per_second))
    }
}

pub fn default_settings_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sndring")
            .join("settings.json")
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                std::env::var_os("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
                    .join(".local")
                    .join("share")
            })
            .join("sndring")
            .join("settings.json")
    }
}

/// Load settings, falling back to defaults when the file is absent or invalid.
pub fn load_settings(path: &Path) -> AppSettings {
    let mut settings = fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str::<AppSettings>(&raw).ok())
        .unwrap_or_default();
    settings.normalize();
    settings
}

/// Load settings from a path the user named explicitly; errors are reported.
pub fn load_settings_strict(path: &Path) -> anyhow::Result<AppSettings> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading settings from {}", path.display()))?;
    let mut settings: AppSettings = serde_json::from_str(&raw)
        .with_context(|| format!("parsing settings in {}", path.display()))?;
    settings.normalize();
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let settings: AppSettings =
            serde_json::from_str(r#"{ "toneHz": 220.0, "engine": { "sampleRate": 22050 } }"#)
                .unwrap();
        assert_eq!(settings.tone_hz, 220.0);
        assert_eq!(settings.engine.sample_rate, 22_050);
        assert_eq!(settings.engine.latency_ms, 100);
        assert_eq!(settings.frames_per_second, 60);
    }

    #[test]
    fn total_frames_saturates_on_huge_runs() {
        let mut settings = AppSettings::default();
        assert_eq!(settings.total_frames(), 5 * 60);

        settings.run_seconds = u64::MAX;
        assert_eq!(settings.total_frames(), u64::MAX);
    }

    #[test]
    fn normalize_clamps_and_drops_blank_device() {
        let mut settings = AppSettings {
            volume: 3.0,
            frames_per_second: 0,
            ..AppSettings::default()
        };
        settings.engine.output_device = Some("   ".into());
        settings.normalize();
        assert_eq!(settings.volume, 1.0);
        assert_eq!(settings.frames_per_second, 1);
        assert_eq!(settings.engine.output_device, None);
    }
}
