//! Cue waveform synthesis

use std::f32::consts::PI;
use std::time::Duration;

use crate::config::AudioConfig;

/// Fade applied at both ends of the tone to avoid clicks
const FADE: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneSpec {
    pub frequency_hz: f32,
    pub duration: Duration,
}

impl ToneSpec {
    pub fn from_config(config: &AudioConfig) -> Self {
        Self {
            frequency_hz: config.cue_frequency_hz,
            duration: config.cue_duration(),
        }
    }
}

impl Default for ToneSpec {
    fn default() -> Self {
        Self::from_config(&AudioConfig::default())
    }
}

/// Render an interleaved f32 sine tone scaled by `volume`
pub fn render_tone(spec: &ToneSpec, sample_rate: u32, channels: u16, volume: f32) -> Vec<f32> {
    let volume = volume.clamp(0.0, 1.0);
    let channels = channels.max(1) as usize;
    let frames = (spec.duration.as_secs_f64() * sample_rate as f64).round() as usize;
    let fade = ((FADE.as_secs_f64() * sample_rate as f64) as usize).min(frames / 2);

    let mut samples = Vec::with_capacity(frames * channels);
    for i in 0..frames {
        let t = i as f32 / sample_rate as f32;
        let envelope = if fade == 0 {
            1.0
        } else if i < fade {
            i as f32 / fade as f32
        } else if i >= frames - fade {
            (frames - 1 - i) as f32 / fade as f32
        } else {
            1.0
        };
        let value = (2.0 * PI * spec.frequency_hz * t).sin() * volume * envelope;
        samples.extend(std::iter::repeat(value).take(channels));
    }
    samples
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tone_length() {
        let spec = ToneSpec {
            frequency_hz: 440.0,
            duration: Duration::from_millis(100),
        };
        let samples = render_tone(&spec, 48_000, 2, 1.0);
        assert_eq!(samples.len(), 4_800 * 2);
    }

    #[test]
    fn test_tone_peak_follows_volume() {
        let spec = ToneSpec::default();
        for volume in [0.0f32, 0.2, 0.6, 1.0] {
            let samples = render_tone(&spec, 44_100, 1, volume);
            let peak = samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
            assert!(peak <= volume + f32::EPSILON);
            if volume > 0.0 {
                assert!(peak > volume * 0.9, "peak {} for volume {}", peak, volume);
            }
        }
    }

    #[test]
    fn test_tone_fades_in_and_out() {
        let samples = render_tone(&ToneSpec::default(), 48_000, 1, 1.0);
        assert_eq!(samples[0], 0.0);
        assert_eq!(*samples.last().unwrap(), 0.0);
    }

    #[test]
    fn test_stereo_channels_match() {
        let samples = render_tone(&ToneSpec::default(), 48_000, 2, 0.5);
        for pair in samples.chunks(2) {
            assert_eq!(pair[0], pair[1]);
        }
    }
}
