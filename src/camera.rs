//! Camera lifecycle
//!
//! [`CameraSession`] owns the live stream handle exclusively. Callers never
//! get a reference to the stream; they ask the session to act on it.

use std::time::Duration;

use bytes::Bytes;

use crate::check_invariant;
use crate::errors::{CaptureError, Result};
use crate::invariants::STREAM_IFF_ENABLED;
use crate::media::{MediaStream, MediaStreamProvider};
use crate::types::Frame;

pub struct CameraSession {
    enabled: bool,
    mirrored: bool,
    stream: Option<Box<dyn MediaStream>>,
}

impl CameraSession {
    pub fn new(mirrored: bool) -> Self {
        Self {
            enabled: false,
            mirrored,
            stream: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_mirrored(&self) -> bool {
        self.mirrored
    }

    /// Flip the preview orientation; the stream itself is untouched.
    pub fn toggle_mirror(&mut self) -> bool {
        self.mirrored = !self.mirrored;
        self.mirrored
    }

    /// Acquire a stream. Returns `Ok(false)` when already enabled.
    pub async fn enable(&mut self, provider: &dyn MediaStreamProvider) -> Result<bool> {
        if self.enabled {
            return Ok(false);
        }

        let stream = provider.acquire().await?;
        self.stream = Some(stream);
        self.enabled = true;

        check_invariant!(
            self.enabled == self.stream.is_some(),
            STREAM_IFF_ENABLED,
            "CameraSession::enable"
        );
        log::info!("Camera enabled");
        Ok(true)
    }

    /// Release the stream. Idempotent; returns whether a handle was released.
    pub async fn disable(&mut self) -> bool {
        let released = match self.stream.take() {
            Some(mut stream) => {
                stream.release().await;
                true
            }
            None => false,
        };
        self.enabled = false;

        check_invariant!(
            self.enabled == self.stream.is_some(),
            STREAM_IFF_ENABLED,
            "CameraSession::disable"
        );
        if released {
            log::info!("Camera disabled, stream released");
        }
        released
    }

    /// Wait for the stream to deliver frames, bounded by `timeout`
    pub async fn wait_ready(&mut self, timeout: Duration) -> Result<()> {
        let stream = self.stream_mut()?;
        match tokio::time::timeout(timeout, stream.ready()).await {
            Ok(result) => result,
            Err(_) => Err(CaptureError::StreamUnavailable(format!(
                "Stream not ready after {}ms",
                timeout.as_millis()
            ))),
        }
    }

    pub async fn grab_frame(&mut self) -> Result<Frame> {
        self.stream_mut()?.grab_frame().await
    }

    pub fn is_recording(&self) -> bool {
        self.stream.as_ref().is_some_and(|s| s.is_recording())
    }

    pub async fn start_clip(&mut self) -> Result<()> {
        self.stream_mut()?.start_recording().await
    }

    /// Flush buffered clip data; no-op when the recorder is idle or the
    /// camera is off.
    pub async fn flush_clip(&mut self) -> Result<()> {
        match self.stream.as_mut() {
            Some(stream) if stream.is_recording() => stream.request_data().await,
            _ => Ok(()),
        }
    }

    /// Finalize the pending clip; empty bytes when nothing was recording
    pub async fn finish_clip(&mut self) -> Result<Bytes> {
        match self.stream.as_mut() {
            Some(stream) if stream.is_recording() => stream.stop_recording().await,
            _ => Ok(Bytes::new()),
        }
    }

    fn stream_mut(&mut self) -> Result<&mut Box<dyn MediaStream>> {
        self.stream
            .as_mut()
            .ok_or_else(|| CaptureError::StreamUnavailable("Camera is off".to_string()))
    }
}
