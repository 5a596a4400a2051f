//! Runtime configuration for camwatch
//!
//! Holds camera, recording, audio cue and storage settings. Nothing is
//! persisted: hosts either build a config in code or hand over a TOML string.

use crate::errors::CaptureError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CamwatchConfig {
    pub camera: CameraConfig,
    pub recording: RecordingConfig,
    pub audio: AudioConfig,
    pub storage: StorageConfig,
}

/// Camera session settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Whether the preview starts mirrored
    pub start_mirrored: bool,
    /// Upper bound on waiting for a freshly acquired stream to deliver frames
    pub readiness_timeout_ms: u64,
    /// Flip encoded snapshots horizontally while the preview is mirrored
    pub mirror_snapshots: bool,
}

/// Clip recording settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// Wall-clock ceiling after which a clip is finalized automatically
    pub max_clip_duration_ms: u64,
    /// MIME type advertised for finished clips
    pub clip_mime: String,
}

/// Audible cue settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Initial cue volume (0.0-1.0)
    pub default_volume: f32,
    /// Cue tone frequency in Hz
    pub cue_frequency_hz: f32,
    /// Cue tone length in milliseconds
    pub cue_duration_ms: u64,
}

/// Download handoff settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory used by `DownloadDirSink`
    pub download_dir: String,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            start_mirrored: true,
            readiness_timeout_ms: 3_000,
            mirror_snapshots: false,
        }
    }
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            max_clip_duration_ms: 30_000,
            clip_mime: "video/webm".to_string(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            default_volume: 0.8,
            cue_frequency_hz: 880.0,
            cue_duration_ms: 150,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            download_dir: "./downloads".to_string(),
        }
    }
}

impl CameraConfig {
    pub fn readiness_timeout(&self) -> Duration {
        Duration::from_millis(self.readiness_timeout_ms)
    }
}

impl RecordingConfig {
    pub fn max_clip_duration(&self) -> Duration {
        Duration::from_millis(self.max_clip_duration_ms)
    }
}

impl AudioConfig {
    pub fn cue_duration(&self) -> Duration {
        Duration::from_millis(self.cue_duration_ms)
    }
}

impl StorageConfig {
    pub fn download_path(&self) -> PathBuf {
        PathBuf::from(&self.download_dir)
    }
}

impl CamwatchConfig {
    /// Parse and validate a TOML document; missing keys keep their defaults
    pub fn from_toml_str(contents: &str) -> Result<Self, CaptureError> {
        let config: CamwatchConfig = toml::from_str(contents)
            .map_err(|e| CaptureError::ConfigError(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        log::debug!("Parsed configuration: {:?}", config);
        Ok(config)
    }

    /// Render the configuration as TOML
    pub fn to_toml_string(&self) -> Result<String, CaptureError> {
        toml::to_string_pretty(self)
            .map_err(|e| CaptureError::ConfigError(format!("Failed to serialize config: {}", e)))
    }

    /// Set the clip ceiling
    pub fn with_max_clip_duration(mut self, duration: Duration) -> Self {
        self.recording.max_clip_duration_ms = duration.as_millis() as u64;
        self
    }

    /// Set the readiness timeout
    pub fn with_readiness_timeout(mut self, timeout: Duration) -> Self {
        self.camera.readiness_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the download directory
    pub fn with_download_dir(mut self, dir: impl Into<String>) -> Self {
        self.storage.download_dir = dir.into();
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), CaptureError> {
        if self.camera.readiness_timeout_ms == 0 {
            return Err(CaptureError::ConfigError(
                "Readiness timeout must be greater than zero".to_string(),
            ));
        }
        if self.recording.max_clip_duration_ms == 0 {
            return Err(CaptureError::ConfigError(
                "Maximum clip duration must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.audio.default_volume) {
            return Err(CaptureError::ConfigError(
                "Default volume must be between 0.0 and 1.0".to_string(),
            ));
        }
        if !(self.audio.cue_frequency_hz > 0.0) {
            return Err(CaptureError::ConfigError(
                "Cue frequency must be positive".to_string(),
            ));
        }
        if self.audio.cue_duration_ms == 0 {
            return Err(CaptureError::ConfigError(
                "Cue duration must be greater than zero".to_string(),
            ));
        }
        if self.storage.download_dir.trim().is_empty() {
            return Err(CaptureError::ConfigError(
                "Download directory must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CamwatchConfig::default();
        assert_eq!(config.recording.max_clip_duration(), Duration::from_secs(30));
        assert_eq!(config.audio.default_volume, 0.8);
        assert!(config.camera.start_mirrored);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut bad = CamwatchConfig::default();
        bad.recording.max_clip_duration_ms = 0;
        assert!(bad.validate().is_err());

        let mut bad = CamwatchConfig::default();
        bad.audio.default_volume = 1.5;
        assert!(bad.validate().is_err());

        let mut bad = CamwatchConfig::default();
        bad.audio.cue_frequency_hz = f32::NAN;
        assert!(bad.validate().is_err());

        let bad = CamwatchConfig::default().with_download_dir("  ");
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = CamwatchConfig::from_toml_str(
            r#"
            [recording]
            max_clip_duration_ms = 10000

            [audio]
            default_volume = 0.4
            "#,
        )
        .unwrap();

        assert_eq!(config.recording.max_clip_duration_ms, 10_000);
        assert_eq!(config.recording.clip_mime, "video/webm");
        assert_eq!(config.audio.default_volume, 0.4);
        assert_eq!(config.camera.readiness_timeout_ms, 3_000);
    }

    #[test]
    fn test_invalid_toml_rejected() {
        assert!(CamwatchConfig::from_toml_str("[recording\nbroken").is_err());
        assert!(CamwatchConfig::from_toml_str("[audio]\ndefault_volume = 3.0").is_err());
    }

    #[test]
    fn test_config_toml_format() {
        let toml_string = CamwatchConfig::default().to_toml_string().unwrap();

        assert!(toml_string.contains("[camera]"));
        assert!(toml_string.contains("[recording]"));
        assert!(toml_string.contains("[audio]"));
        assert!(toml_string.contains("[storage]"));
        assert!(toml_string.contains("max_clip_duration_ms"));
    }

    #[test]
    fn test_builders() {
        let config = CamwatchConfig::default()
            .with_max_clip_duration(Duration::from_secs(5))
            .with_readiness_timeout(Duration::from_millis(250))
            .with_download_dir("/tmp/clips");

        assert_eq!(config.recording.max_clip_duration_ms, 5_000);
        assert_eq!(config.camera.readiness_timeout_ms, 250);
        assert_eq!(config.storage.download_path(), PathBuf::from("/tmp/clips"));
    }
}
