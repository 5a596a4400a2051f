use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Pixel layout of a captured frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    Rgb8,
    Rgba8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 => 4,
        }
    }
}

/// A single still frame pulled from the live stream
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: Vec<u8>,
    pub captured_at: DateTime<Local>,
}

impl Frame {
    pub fn new(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            format,
            data,
            captured_at: Local::now(),
        }
    }

    /// Frame stamped with an explicit capture time
    pub fn captured_at(mut self, timestamp: DateTime<Local>) -> Self {
        self.captured_at = timestamp;
        self
    }

    /// Number of bytes the declared dimensions require
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }
}

/// Who asked for a recording to start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartTrigger {
    User,
    Presence,
}

/// Why a recording ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StopReason {
    UserRequest,
    AutoSegment,
    PresenceLost,
    CameraDisabled,
}

/// Snapshot of everything the presentation layer renders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerState {
    pub camera_on: bool,
    pub mirrored: bool,
    pub is_recording: bool,
    pub auto_record_enabled: bool,
    pub volume: f32,
    pub recording_started_at: Option<DateTime<Local>>,
    pub auto_stop_armed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_expected_len() {
        let frame = Frame::new(4, 2, PixelFormat::Rgb8, vec![0; 24]);
        assert_eq!(frame.expected_len(), 24);

        let frame = Frame::new(4, 2, PixelFormat::Rgba8, vec![0; 32]);
        assert_eq!(frame.expected_len(), 32);
    }

    #[test]
    fn test_controller_state_serializes_camel_case() {
        let state = ControllerState {
            camera_on: true,
            mirrored: true,
            is_recording: false,
            auto_record_enabled: false,
            volume: 0.8,
            recording_started_at: None,
            auto_stop_armed: false,
        };

        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"cameraOn\":true"));
        assert!(json.contains("\"isRecording\":false"));
        assert!(json.contains("\"autoRecordEnabled\":false"));
    }
}
