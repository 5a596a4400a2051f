//! Audible cues and volume state
//!
//! - `tone`: cue waveform synthesis
//! - `beeper` (`audio` feature): playback on the default output device via cpal
//!
//! The volume lives in [`VolumeSetting`], owned by the controller and read at
//! the moment a cue is emitted; emitters never cache it.

#[cfg(feature = "audio")]
mod beeper;
pub mod tone;

#[cfg(feature = "audio")]
pub use beeper::CpalCue;
pub use tone::{render_tone, ToneSpec};

use crate::errors::{CaptureError, Result};

/// Plays a short tone. Fire-and-forget: never blocks and never fails
/// towards the caller.
pub trait AudioCue: Send + Sync {
    fn emit(&self, volume: f32);
}

/// Cue emitter that plays nothing
#[derive(Debug, Default)]
pub struct SilentCue;

impl AudioCue for SilentCue {
    fn emit(&self, volume: f32) {
        log::trace!("Silent cue at volume {:.2}", volume);
    }
}

/// Cue volume in `[0.0, 1.0]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeSetting {
    level: f32,
}

impl VolumeSetting {
    pub fn new(level: f32) -> Result<Self> {
        let mut setting = Self { level: 0.0 };
        setting.set(level)?;
        Ok(setting)
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    /// Set the level, clamping into range. Non-finite input is rejected.
    pub fn set(&mut self, level: f32) -> Result<f32> {
        if !level.is_finite() {
            return Err(CaptureError::InvalidVolume(level));
        }
        self.level = level.clamp(0.0, 1.0);
        Ok(self.level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_clamps() {
        let mut volume = VolumeSetting::new(0.8).unwrap();
        assert_eq!(volume.set(1.7).unwrap(), 1.0);
        assert_eq!(volume.set(-0.2).unwrap(), 0.0);
        assert_eq!(volume.set(0.4).unwrap(), 0.4);
        assert_eq!(volume.level(), 0.4);
    }

    #[test]
    fn test_volume_rejects_nan() {
        let mut volume = VolumeSetting::new(0.5).unwrap();
        assert!(matches!(volume.set(f32::NAN), Err(CaptureError::InvalidVolume(_))));
        assert!(volume.set(f32::INFINITY).is_err());
        assert_eq!(volume.level(), 0.5, "rejected input leaves the level alone");
    }
}
