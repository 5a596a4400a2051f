//! Hardware camera backend
//!
//! Each stream runs a dedicated capture thread that owns the nokhwa camera.
//! The thread keeps the latest decoded frame for stills and feeds every
//! frame to the WebM encoder while a clip is being recorded.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;
use tokio::sync::{oneshot, watch};

use super::webm::WebmEncoder;
use super::{MediaStream, MediaStreamProvider};
use crate::errors::{CaptureError, Result};
use crate::types::{Frame, PixelFormat};

/// Opens the camera at `index` (0 = system default). `fps` is used only
/// when the device does not report its own frame rate.
#[derive(Debug, Clone)]
pub struct NativeStreamProvider {
    index: u32,
    fps: u32,
}

impl Default for NativeStreamProvider {
    fn default() -> Self {
        Self { index: 0, fps: 30 }
    }
}

impl NativeStreamProvider {
    pub fn new(index: u32, fps: u32) -> Self {
        Self { index, fps }
    }
}

/// State shared between a stream handle and its capture thread
struct Capture {
    running: AtomicBool,
    latest: Mutex<Option<Frame>>,
    encoder: Mutex<Option<WebmEncoder>>,
}

#[async_trait]
impl MediaStreamProvider for NativeStreamProvider {
    async fn acquire(&self) -> Result<Box<dyn MediaStream>> {
        let capture = Arc::new(Capture {
            running: AtomicBool::new(true),
            latest: Mutex::new(None),
            encoder: Mutex::new(None),
        });
        let (opened_tx, opened_rx) = oneshot::channel();
        let (ready_tx, ready_rx) = watch::channel(false);

        let index = self.index;
        let fallback_fps = self.fps;
        let thread_capture = capture.clone();
        let thread = std::thread::Builder::new()
            .name("camwatch-capture".to_string())
            .spawn(move || capture_loop(index, fallback_fps, thread_capture, opened_tx, ready_tx))
            .map_err(|e| CaptureError::StreamUnavailable(format!("Failed to start capture: {}", e)))?;

        let opened = opened_rx
            .await
            .map_err(|_| CaptureError::StreamUnavailable("Capture thread exited".to_string()))?;
        let device_fps = match opened {
            Ok(fps) => fps,
            Err(e) => {
                let _ = thread.join();
                return Err(e);
            }
        };
        let fps = effective_fps(device_fps, self.fps);

        log::info!("Camera {} stream acquired at {}fps", index, fps);
        Ok(Box::new(NativeStream {
            capture,
            ready_rx,
            thread: Some(thread),
            fps,
        }))
    }
}

/// Rate the encoder stamps frames at: the device's own rate, so clip time
/// matches wall-clock time
fn effective_fps(device_fps: u32, fallback: u32) -> u32 {
    if device_fps > 0 {
        device_fps
    } else {
        fallback.max(1)
    }
}

/// Pause after a failed grab so an unplugged camera does not spin the thread
fn retry_delay(fps: u32) -> Duration {
    Duration::from_secs(1) / fps.max(1)
}

fn capture_loop(
    index: u32,
    fallback_fps: u32,
    capture: Arc<Capture>,
    opened_tx: oneshot::Sender<Result<u32>>,
    ready_tx: watch::Sender<bool>,
) {
    let format = RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);
    let mut camera = match Camera::new(CameraIndex::Index(index), format) {
        Ok(camera) => camera,
        Err(e) => {
            let _ = opened_tx.send(Err(CaptureError::StreamUnavailable(format!(
                "Failed to open camera {}: {}",
                index, e
            ))));
            return;
        }
    };
    if let Err(e) = camera.open_stream() {
        let _ = opened_tx.send(Err(CaptureError::StreamUnavailable(format!(
            "Failed to start camera stream: {}",
            e
        ))));
        return;
    }
    let device_fps = camera.frame_rate();
    let _ = opened_tx.send(Ok(device_fps));
    let backoff = retry_delay(effective_fps(device_fps, fallback_fps));

    while capture.running.load(Ordering::SeqCst) {
        let decoded = match camera.frame().and_then(|buffer| buffer.decode_image::<RgbFormat>()) {
            Ok(image) => image,
            Err(e) => {
                log::debug!("Failed to capture frame: {}", e);
                std::thread::sleep(backoff);
                continue;
            }
        };
        let frame = Frame::new(
            decoded.width(),
            decoded.height(),
            PixelFormat::Rgb8,
            decoded.into_raw(),
        );

        if let Ok(mut encoder) = capture.encoder.lock() {
            if let Some(active) = encoder.as_mut() {
                if let Err(e) = active.write_frame(&frame.data) {
                    log::warn!("Dropping frame from clip: {}", e);
                }
            }
        }
        if let Ok(mut latest) = capture.latest.lock() {
            *latest = Some(frame);
        }
        ready_tx.send_if_modified(|ready| !std::mem::replace(ready, true));
    }

    if let Err(e) = camera.stop_stream() {
        log::warn!("Error stopping camera stream: {}", e);
    }
    log::debug!("Capture thread for camera {} stopped", index);
}

pub struct NativeStream {
    capture: Arc<Capture>,
    ready_rx: watch::Receiver<bool>,
    thread: Option<JoinHandle<()>>,
    fps: u32,
}

impl NativeStream {
    fn lock_encoder(&self) -> Result<std::sync::MutexGuard<'_, Option<WebmEncoder>>> {
        self.capture
            .encoder
            .lock()
            .map_err(|_| CaptureError::EncodingFailure("Encoder lock poisoned".to_string()))
    }

    fn stop_thread(&mut self) {
        self.capture.running.store(false, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

#[async_trait]
impl MediaStream for NativeStream {
    async fn ready(&mut self) -> Result<()> {
        self.ready_rx
            .wait_for(|ready| *ready)
            .await
            .map(|_| ())
            .map_err(|_| CaptureError::StreamUnavailable("Capture thread exited".to_string()))
    }

    async fn grab_frame(&mut self) -> Result<Frame> {
        self.capture
            .latest
            .lock()
            .ok()
            .and_then(|latest| latest.clone())
            .ok_or_else(|| CaptureError::StreamUnavailable("No frame captured yet".to_string()))
    }

    fn is_recording(&self) -> bool {
        self.capture
            .encoder
            .lock()
            .map(|encoder| encoder.is_some())
            .unwrap_or(false)
    }

    async fn start_recording(&mut self) -> Result<()> {
        let (width, height) = {
            let latest = self.grab_frame().await?;
            (latest.width, latest.height)
        };
        let encoder = WebmEncoder::spawn(width, height, self.fps)?;

        let mut slot = self.lock_encoder()?;
        if slot.is_some() {
            return Err(CaptureError::EncodingFailure("Recorder already running".to_string()));
        }
        *slot = Some(encoder);
        log::debug!("Recorder started at {}x{}", width, height);
        Ok(())
    }

    async fn request_data(&mut self) -> Result<()> {
        let mut slot = self.lock_encoder()?;
        match slot.as_mut() {
            Some(encoder) => encoder.flush(),
            None => Ok(()),
        }
    }

    async fn stop_recording(&mut self) -> Result<Bytes> {
        let pending = {
            let mut slot = self.lock_encoder()?;
            slot.take()
        };
        let Some(encoder) = pending else {
            return Ok(Bytes::new());
        };
        let clip = tokio::task::spawn_blocking(move || encoder.finish())
            .await
            .map_err(|e| CaptureError::EncodingFailure(format!("Encoder task failed: {}", e)))??;
        Ok(Bytes::from(clip))
    }

    async fn release(&mut self) {
        if let Ok(mut encoder) = self.capture.encoder.lock() {
            encoder.take();
        }
        self.stop_thread();
        log::info!("Camera stream released");
    }
}

impl Drop for NativeStream {
    fn drop(&mut self) {
        self.stop_thread();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_rate_wins_over_fallback() {
        assert_eq!(effective_fps(60, 30), 60);
        assert_eq!(effective_fps(0, 30), 30);
        assert_eq!(effective_fps(0, 0), 1);
    }

    #[test]
    fn test_retry_delay_is_one_frame() {
        assert_eq!(retry_delay(30), Duration::from_secs(1) / 30);
        assert_eq!(retry_delay(0), Duration::from_secs(1));
    }
}
