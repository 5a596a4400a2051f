//! WebM clip encoder backed by an ffmpeg child process
//!
//! Raw RGB frames go in on stdin, the WebM container comes back on stdout
//! and is collected in memory by a reader thread.

use std::io::{Read, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;

use crate::errors::{CaptureError, Result};

pub(crate) struct WebmEncoder {
    process: Child,
    stdin: Option<ChildStdin>,
    reader: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
    frame_len: usize,
    frame_count: u64,
}

impl WebmEncoder {
    /// `fps` must be the rate frames actually arrive at; the raw input
    /// carries no timestamps of its own.
    pub(crate) fn spawn(width: u32, height: u32, fps: u32) -> Result<Self> {
        let args = encoder_args(width, height, fps);

        log::debug!("Starting ffmpeg: {:?}", args);

        let mut process = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| CaptureError::EncodingFailure(format!("Failed to start ffmpeg: {}", e)))?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| CaptureError::EncodingFailure("Failed to capture ffmpeg stdin".to_string()))?;
        let mut stdout = process
            .stdout
            .take()
            .ok_or_else(|| CaptureError::EncodingFailure("Failed to capture ffmpeg stdout".to_string()))?;

        let reader = std::thread::Builder::new()
            .name("camwatch-webm-out".to_string())
            .spawn(move || {
                let mut clip = Vec::new();
                stdout.read_to_end(&mut clip)?;
                Ok(clip)
            })
            .map_err(|e| CaptureError::EncodingFailure(format!("Failed to start reader: {}", e)))?;

        Ok(Self {
            process,
            stdin: Some(stdin),
            reader: Some(reader),
            frame_len: width as usize * height as usize * 3,
            frame_count: 0,
        })
    }

    /// Feed one RGB frame. Frames of the wrong size are skipped.
    pub(crate) fn write_frame(&mut self, rgb: &[u8]) -> Result<()> {
        if rgb.len() != self.frame_len {
            log::debug!("Skipping {} byte frame, encoder expects {}", rgb.len(), self.frame_len);
            return Ok(());
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| CaptureError::EncodingFailure("Encoder already finished".to_string()))?;
        stdin
            .write_all(rgb)
            .map_err(|e| CaptureError::EncodingFailure(format!("Failed to write frame: {}", e)))?;
        self.frame_count += 1;
        Ok(())
    }

    pub(crate) fn flush(&mut self) -> Result<()> {
        if let Some(stdin) = self.stdin.as_mut() {
            stdin
                .flush()
                .map_err(|e| CaptureError::EncodingFailure(format!("Failed to flush frames: {}", e)))?;
        }
        Ok(())
    }

    /// Close the input, wait for ffmpeg and return the finished container
    pub(crate) fn finish(mut self) -> Result<Vec<u8>> {
        drop(self.stdin.take());

        let status = self
            .process
            .wait()
            .map_err(|e| CaptureError::EncodingFailure(format!("Failed to wait for ffmpeg: {}", e)))?;

        let clip = match self.reader.take() {
            Some(reader) => reader
                .join()
                .map_err(|_| CaptureError::EncodingFailure("Reader thread panicked".to_string()))?
                .map_err(|e| CaptureError::EncodingFailure(format!("Failed to read clip: {}", e)))?,
            None => Vec::new(),
        };

        if !status.success() {
            return Err(CaptureError::EncodingFailure(format!(
                "ffmpeg exited with {}",
                status
            )));
        }

        log::info!("WebM clip finished: {} frames, {} bytes", self.frame_count, clip.len());
        Ok(clip)
    }
}

fn encoder_args(width: u32, height: u32, fps: u32) -> Vec<String> {
    vec![
        "-loglevel".to_string(),
        "error".to_string(),
        "-f".to_string(),
        "rawvideo".to_string(),
        "-pix_fmt".to_string(),
        "rgb24".to_string(),
        "-s".to_string(),
        format!("{}x{}", width, height),
        "-r".to_string(),
        fps.to_string(),
        "-i".to_string(),
        "-".to_string(),
        "-c:v".to_string(),
        "libvpx".to_string(),
        "-deadline".to_string(),
        "realtime".to_string(),
        "-b:v".to_string(),
        "1M".to_string(),
        "-f".to_string(),
        "webm".to_string(),
        "pipe:1".to_string(),
    ]
}

impl Drop for WebmEncoder {
    fn drop(&mut self) {
        if self.stdin.take().is_some() {
            let _ = self.process.kill();
            let _ = self.process.wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_stamp_frames_at_given_rate() {
        let args = encoder_args(1280, 720, 60);
        let rate = args.iter().position(|a| a == "-r").unwrap();
        assert_eq!(args[rate + 1], "60");
        let size = args.iter().position(|a| a == "-s").unwrap();
        assert_eq!(args[size + 1], "1280x720");
        assert_eq!(args.last().map(String::as_str), Some("pipe:1"));
    }
}
