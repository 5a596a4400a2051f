//! Cue playback on the default output device
//!
//! cpal streams are not `Send`, so a dedicated thread owns the device and
//! plays queued cues. `emit` only does a non-blocking send; when the queue
//! is full or the thread is gone the cue is dropped.

use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender, TrySendError};

use super::tone::{render_tone, ToneSpec};
use super::AudioCue;

/// Pending cues beyond this are dropped
const MAX_QUEUED_CUES: usize = 4;

/// Extra time the stream stays open after the last sample
const DRAIN_MARGIN: Duration = Duration::from_millis(30);

pub struct CpalCue {
    tx: Sender<f32>,
}

impl CpalCue {
    /// Start the playback thread
    pub fn spawn(spec: ToneSpec) -> std::io::Result<Self> {
        let (tx, rx) = crossbeam_channel::bounded(MAX_QUEUED_CUES);
        std::thread::Builder::new()
            .name("camwatch-cue".to_string())
            .spawn(move || cue_loop(rx, spec))?;
        Ok(Self { tx })
    }
}

impl AudioCue for CpalCue {
    fn emit(&self, volume: f32) {
        match self.tx.try_send(volume) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => log::debug!("Cue queue full, dropping cue"),
            Err(TrySendError::Disconnected(_)) => log::warn!("Cue thread is gone, dropping cue"),
        }
    }
}

fn cue_loop(rx: Receiver<f32>, spec: ToneSpec) {
    while let Ok(volume) = rx.recv() {
        if let Err(e) = play_tone(&spec, volume) {
            log::warn!("Failed to play cue: {}", e);
        }
    }
    log::debug!("Cue thread stopped");
}

fn play_tone(spec: &ToneSpec, volume: f32) -> Result<(), String> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| "No default audio output device".to_string())?;

    let supported = device
        .default_output_config()
        .map_err(|e| format!("No supported output config: {}", e))?;
    if supported.sample_format() != cpal::SampleFormat::F32 {
        return Err(format!(
            "Unsupported output sample format {:?}",
            supported.sample_format()
        ));
    }

    let config: cpal::StreamConfig = supported.config();
    let samples = render_tone(spec, config.sample_rate.0, config.channels, volume);
    let mut position = 0usize;

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                for sample in data.iter_mut() {
                    *sample = samples.get(position).copied().unwrap_or(0.0);
                    position += 1;
                }
            },
            |e| log::warn!("Cue output stream error: {}", e),
            None,
        )
        .map_err(|e| format!("Failed to build output stream: {}", e))?;

    stream
        .play()
        .map_err(|e| format!("Failed to start output stream: {}", e))?;
    std::thread::sleep(spec.duration + DRAIN_MARGIN);
    Ok(())
}
