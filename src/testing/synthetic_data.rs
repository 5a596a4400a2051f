//! Synthetic camera backend
//!
//! Frames are a gradient that shifts with the frame number, so consecutive
//! frames differ the way a real feed does. Clips are opaque byte buffers
//! that start with the EBML magic of a WebM container.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::time::Instant;

use crate::errors::{CaptureError, Result};
use crate::media::{MediaStream, MediaStreamProvider};
use crate::types::{Frame, PixelFormat};

/// EBML header magic every WebM file starts with
pub const WEBM_MAGIC: [u8; 4] = [0x1A, 0x45, 0xDF, 0xA3];

/// Create a synthetic RGB frame
pub fn synthetic_frame(frame_number: u64, width: u32, height: u32) -> Frame {
    let mut data = vec![0u8; (width * height * 3) as usize];

    let base = (frame_number % 256) as u8;
    for y in 0..height {
        for x in 0..width {
            let idx = ((y * width + x) * 3) as usize;
            data[idx] = base.wrapping_add((x % 256) as u8);
            data[idx + 1] = base.wrapping_add((y % 256) as u8);
            data[idx + 2] = base.wrapping_add(((x + y) % 256) as u8);
        }
    }

    Frame::new(width, height, PixelFormat::Rgb8, data)
}

/// Counters shared by a provider and every stream it handed out
#[derive(Debug, Default)]
struct Counters {
    acquired: AtomicUsize,
    released: AtomicUsize,
    clips_started: AtomicUsize,
}

/// Point-in-time view of a provider's counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamStats {
    pub acquired: usize,
    pub released: usize,
    pub clips_started: usize,
}

#[derive(Debug, Clone, Copy)]
enum Readiness {
    After(Duration),
    Never,
}

/// Hands out [`SyntheticStream`]s
#[derive(Debug, Clone)]
pub struct SyntheticStreamProvider {
    available: bool,
    readiness: Readiness,
    empty_clips: bool,
    resolution: (u32, u32),
    counters: Arc<Counters>,
}

impl Default for SyntheticStreamProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntheticStreamProvider {
    pub fn new() -> Self {
        Self {
            available: true,
            readiness: Readiness::After(Duration::ZERO),
            empty_clips: false,
            resolution: (64, 48),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Every acquire fails as if no camera were attached
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// Streams start delivering frames only after `delay`
    pub fn ready_after(mut self, delay: Duration) -> Self {
        self.readiness = Readiness::After(delay);
        self
    }

    /// Streams never deliver a frame
    pub fn never_ready(mut self) -> Self {
        self.readiness = Readiness::Never;
        self
    }

    /// The recorder finalizes every clip without data
    pub fn empty_clips(mut self) -> Self {
        self.empty_clips = true;
        self
    }

    pub fn resolution(mut self, width: u32, height: u32) -> Self {
        self.resolution = (width, height);
        self
    }

    pub fn stats(&self) -> StreamStats {
        StreamStats {
            acquired: self.counters.acquired.load(Ordering::SeqCst),
            released: self.counters.released.load(Ordering::SeqCst),
            clips_started: self.counters.clips_started.load(Ordering::SeqCst),
        }
    }
}

#[async_trait]
impl MediaStreamProvider for SyntheticStreamProvider {
    async fn acquire(&self) -> Result<Box<dyn MediaStream>> {
        if !self.available {
            return Err(CaptureError::StreamUnavailable(
                "No synthetic camera attached".to_string(),
            ));
        }

        self.counters.acquired.fetch_add(1, Ordering::SeqCst);
        let ready_at = match self.readiness {
            Readiness::After(delay) => Some(Instant::now() + delay),
            Readiness::Never => None,
        };

        Ok(Box::new(SyntheticStream {
            ready_at,
            empty_clips: self.empty_clips,
            resolution: self.resolution,
            frame_number: 0,
            clip: None,
            released: false,
            counters: self.counters.clone(),
        }))
    }
}

/// A generated stream with an in-memory recorder
pub struct SyntheticStream {
    ready_at: Option<Instant>,
    empty_clips: bool,
    resolution: (u32, u32),
    frame_number: u64,
    clip: Option<BytesMut>,
    released: bool,
    counters: Arc<Counters>,
}

impl SyntheticStream {
    fn mark_released(&mut self) {
        if !self.released {
            self.released = true;
            self.counters.released.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl MediaStream for SyntheticStream {
    async fn ready(&mut self) -> Result<()> {
        match self.ready_at {
            Some(at) => {
                tokio::time::sleep_until(at).await;
                Ok(())
            }
            None => std::future::pending().await,
        }
    }

    async fn grab_frame(&mut self) -> Result<Frame> {
        if self.released {
            return Err(CaptureError::StreamUnavailable("Stream released".to_string()));
        }
        self.frame_number += 1;
        let (width, height) = self.resolution;
        Ok(synthetic_frame(self.frame_number, width, height))
    }

    fn is_recording(&self) -> bool {
        self.clip.is_some()
    }

    async fn start_recording(&mut self) -> Result<()> {
        if self.clip.is_some() {
            return Err(CaptureError::EncodingFailure(
                "Recorder already running".to_string(),
            ));
        }
        let mut clip = BytesMut::new();
        if !self.empty_clips {
            clip.extend_from_slice(&WEBM_MAGIC);
        }
        self.clip = Some(clip);
        self.counters.clips_started.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn request_data(&mut self) -> Result<()> {
        if self.empty_clips {
            return Ok(());
        }
        self.frame_number += 1;
        let chunk = self.frame_number.to_le_bytes();
        if let Some(clip) = self.clip.as_mut() {
            clip.extend_from_slice(&chunk);
        }
        Ok(())
    }

    async fn stop_recording(&mut self) -> Result<Bytes> {
        Ok(self.clip.take().map(BytesMut::freeze).unwrap_or_default())
    }

    async fn release(&mut self) {
        self.clip = None;
        self.mark_released();
    }
}

impl Drop for SyntheticStream {
    fn drop(&mut self) {
        self.mark_released();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_matches_dimensions() {
        let frame = synthetic_frame(3, 8, 4);
        assert_eq!(frame.data.len(), frame.expected_len());
        assert_eq!(frame.format, PixelFormat::Rgb8);
    }

    #[test]
    fn test_frames_vary_by_number() {
        assert_ne!(synthetic_frame(1, 4, 4).data, synthetic_frame(2, 4, 4).data);
    }

    #[tokio::test]
    async fn test_clip_starts_with_webm_magic() {
        let provider = SyntheticStreamProvider::new();
        let mut stream = provider.acquire().await.unwrap();

        stream.start_recording().await.unwrap();
        assert!(stream.is_recording());
        stream.request_data().await.unwrap();

        let clip = stream.stop_recording().await.unwrap();
        assert_eq!(&clip[..4], &WEBM_MAGIC);
        assert!(clip.len() > 4);
        assert!(!stream.is_recording());
    }

    #[tokio::test]
    async fn test_empty_clips_produce_no_bytes() {
        let provider = SyntheticStreamProvider::new().empty_clips();
        let mut stream = provider.acquire().await.unwrap();

        stream.start_recording().await.unwrap();
        stream.request_data().await.unwrap();
        assert!(stream.stop_recording().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_release_counted_once() {
        let provider = SyntheticStreamProvider::new();
        let mut stream = provider.acquire().await.unwrap();

        stream.release().await;
        drop(stream);
        assert_eq!(provider.stats().released, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_ready_times_out() {
        let provider = SyntheticStreamProvider::new().never_ready();
        let mut stream = provider.acquire().await.unwrap();

        let waited = tokio::time::timeout(Duration::from_secs(1), stream.ready()).await;
        assert!(waited.is_err());
    }
}
