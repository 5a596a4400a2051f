//! In-memory collaborators that record what the controller asked of them

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::artifacts::{ArtifactSink, CapturedArtifact};
use crate::audio::AudioCue;
use crate::errors::{CaptureError, Result};
use crate::notify::{Notification, Notifier};

/// Keeps every delivered artifact; can be told to refuse deliveries or to
/// take a while over each one
#[derive(Debug, Default)]
pub struct CollectingSink {
    artifacts: Mutex<Vec<CapturedArtifact>>,
    refuse: bool,
    latency: Duration,
}

impl CollectingSink {
    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }

    /// Every delivery completes only after `latency`
    pub fn slow(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    pub fn artifacts(&self) -> Vec<CapturedArtifact> {
        self.artifacts
            .lock()
            .map(|a| a.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ArtifactSink for CollectingSink {
    async fn deliver(&self, artifact: CapturedArtifact) -> Result<()> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.refuse {
            return Err(CaptureError::DeliveryFailed(format!(
                "Refused {}",
                artifact.filename
            )));
        }
        if let Ok(mut artifacts) = self.artifacts.lock() {
            artifacts.push(artifact);
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct CollectingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl CollectingNotifier {
    pub fn notifications(&self) -> Vec<Notification> {
        self.seen.lock().map(|n| n.clone()).unwrap_or_default()
    }
}

impl Notifier for CollectingNotifier {
    fn notify(&self, notification: Notification) {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(notification);
        }
    }
}

/// Records the volume of every cue instead of playing it
#[derive(Debug, Default)]
pub struct RecordingCue {
    volumes: Mutex<Vec<f32>>,
}

impl RecordingCue {
    pub fn volumes(&self) -> Vec<f32> {
        self.volumes.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

impl AudioCue for RecordingCue {
    fn emit(&self, volume: f32) {
        if let Ok(mut volumes) = self.volumes.lock() {
            volumes.push(volume);
        }
    }
}
