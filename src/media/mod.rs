//! Media stream seam
//!
//! A [`MediaStreamProvider`] hands out live camera streams; a
//! [`MediaStream`] is the exclusively owned handle the camera session keeps
//! while the camera is on. Each stream carries its own clip recorder, the
//! way a browser stream pairs with a `MediaRecorder`.
//!
//! Backends:
//! - `testing::SyntheticStreamProvider`: generated frames and clips, no hardware
//! - `native::NativeStreamProvider` (`native` feature): nokhwa camera, WebM via ffmpeg

#[cfg(feature = "native")]
pub mod native;
#[cfg(feature = "native")]
mod webm;

use async_trait::async_trait;
use bytes::Bytes;

use crate::errors::Result;
use crate::types::Frame;

/// Source of live camera streams
#[async_trait]
pub trait MediaStreamProvider: Send + Sync {
    /// Acquire a new stream. Fails with `StreamUnavailable` when no device
    /// stream can be obtained.
    async fn acquire(&self) -> Result<Box<dyn MediaStream>>;
}

/// A live camera stream plus its clip recorder
#[async_trait]
pub trait MediaStream: Send + Sync {
    /// Resolves once the stream is delivering frames. Completes immediately
    /// on a stream that is already live.
    async fn ready(&mut self) -> Result<()>;

    /// Current frame of the live feed
    async fn grab_frame(&mut self) -> Result<Frame>;

    fn is_recording(&self) -> bool;

    /// Begin buffering a clip
    async fn start_recording(&mut self) -> Result<()>;

    /// Flush buffered media into the pending clip. No-op unless recording.
    async fn request_data(&mut self) -> Result<()>;

    /// Finalize the pending clip and return its bytes. Returns empty bytes
    /// when nothing was recorded.
    async fn stop_recording(&mut self) -> Result<Bytes>;

    /// Release the underlying device. Called exactly once per stream.
    async fn release(&mut self);
}
