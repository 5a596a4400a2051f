use thiserror::Error;

/// Errors surfaced by the capture controller and its collaborators.
///
/// Every failure is local: the controller is back in a well-defined state
/// (camera on or off, never half recording) by the time one of these reaches
/// the caller.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Stream unavailable: {0}")]
    StreamUnavailable(String),
    #[error("Encoding failure: {0}")]
    EncodingFailure(String),
    #[error("Invalid volume level: {0}")]
    InvalidVolume(f32),
    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl CaptureError {
    pub fn is_stream_unavailable(&self) -> bool {
        matches!(self, CaptureError::StreamUnavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, CaptureError>;
