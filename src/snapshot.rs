//! Still-frame encoding
//!
//! Turns one frame from the live feed into PNG bytes. Pure: the same frame
//! always encodes to the same bytes, and nothing is retried.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, RgbImage, RgbaImage};

use crate::artifacts::{ArtifactKind, CapturedArtifact};
use crate::errors::{CaptureError, Result};
use crate::types::{Frame, PixelFormat};

#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotEncoder {
    flip_horizontal: bool,
}

impl SnapshotEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mirror the encoded image horizontally
    pub fn flipped(mut self, flip: bool) -> Self {
        self.flip_horizontal = flip;
        self
    }

    /// Encode a frame to PNG bytes
    pub fn encode(&self, frame: &Frame) -> Result<Vec<u8>> {
        if frame.width == 0 || frame.height == 0 {
            return Err(CaptureError::EncodingFailure(format!(
                "Frame has empty dimensions {}x{}",
                frame.width, frame.height
            )));
        }
        if frame.data.len() != frame.expected_len() {
            return Err(CaptureError::EncodingFailure(format!(
                "Frame data is {} bytes, {}x{} {:?} needs {}",
                frame.data.len(),
                frame.width,
                frame.height,
                frame.format,
                frame.expected_len()
            )));
        }

        let image = match frame.format {
            PixelFormat::Rgb8 => RgbImage::from_raw(frame.width, frame.height, frame.data.clone())
                .map(DynamicImage::ImageRgb8),
            PixelFormat::Rgba8 => {
                RgbaImage::from_raw(frame.width, frame.height, frame.data.clone())
                    .map(DynamicImage::ImageRgba8)
            }
        }
        .ok_or_else(|| {
            CaptureError::EncodingFailure("Failed to create image from frame data".to_string())
        })?;

        let image = if self.flip_horizontal {
            image.fliph()
        } else {
            image
        };

        let mut bytes = Cursor::new(Vec::new());
        image
            .write_to(&mut bytes, ImageFormat::Png)
            .map_err(|e| CaptureError::EncodingFailure(format!("PNG encoding failed: {}", e)))?;

        Ok(bytes.into_inner())
    }

    /// Encode a frame into an image artifact named after its capture time
    pub fn capture(&self, frame: &Frame) -> Result<CapturedArtifact> {
        let png = self.encode(frame)?;
        Ok(CapturedArtifact::new(ArtifactKind::Image, frame.captured_at, png))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::synthetic_frame;

    const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn test_encode_produces_png() {
        let frame = synthetic_frame(0, 16, 8);
        let png = SnapshotEncoder::new().encode(&frame).unwrap();
        assert!(png.starts_with(&PNG_MAGIC));

        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.width(), 16);
        assert_eq!(decoded.height(), 8);
    }

    #[test]
    fn test_encode_is_deterministic() {
        let frame = synthetic_frame(3, 8, 8);
        let encoder = SnapshotEncoder::new();
        assert_eq!(encoder.encode(&frame).unwrap(), encoder.encode(&frame).unwrap());
    }

    #[test]
    fn test_flip_mirrors_pixels() {
        let data = vec![255, 0, 0, 0, 0, 255];
        let frame = Frame::new(2, 1, PixelFormat::Rgb8, data);

        let png = SnapshotEncoder::new().flipped(true).encode(&frame).unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_rgb8();
        assert_eq!(decoded.get_pixel(0, 0).0, [0, 0, 255]);
        assert_eq!(decoded.get_pixel(1, 0).0, [255, 0, 0]);
    }

    #[test]
    fn test_rgba_frames_supported() {
        let frame = Frame::new(2, 2, PixelFormat::Rgba8, vec![128; 16]);
        assert!(SnapshotEncoder::new().encode(&frame).is_ok());
    }

    #[test]
    fn test_mismatched_data_is_encoding_failure() {
        let frame = Frame::new(4, 4, PixelFormat::Rgb8, vec![0; 10]);
        let err = SnapshotEncoder::new().encode(&frame).unwrap_err();
        assert!(matches!(err, CaptureError::EncodingFailure(_)));

        let frame = Frame::new(0, 4, PixelFormat::Rgb8, Vec::new());
        assert!(SnapshotEncoder::new().encode(&frame).is_err());
    }

    #[test]
    fn test_capture_names_artifact() {
        let frame = synthetic_frame(1, 4, 4);
        let artifact = SnapshotEncoder::new().capture(&frame).unwrap();
        assert_eq!(artifact.kind, ArtifactKind::Image);
        assert!(artifact.filename.ends_with(".png"));
        assert_eq!(artifact.captured_at, frame.captured_at);
    }
}
