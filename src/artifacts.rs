//! Captured artifacts and the download handoff
//!
//! An artifact is created at capture or finalization time, handed to an
//! [`ArtifactSink`] immediately, and never referenced again by the
//! controller.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use crate::errors::{CaptureError, Result};

/// Kind of captured artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Image,
    Video,
}

impl ArtifactKind {
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::Image => "png",
            ArtifactKind::Video => "webm",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            ArtifactKind::Image => "image/png",
            ArtifactKind::Video => "video/webm",
        }
    }
}

/// Filename for an artifact captured at `timestamp`: `YYYY-MM-DD_HH-MM-SS.<ext>`
pub fn artifact_filename(kind: ArtifactKind, timestamp: &DateTime<Local>) -> String {
    format!("{}.{}", timestamp.format("%Y-%m-%d_%H-%M-%S"), kind.extension())
}

/// An encoded image or clip ready for download
#[derive(Debug, Clone)]
pub struct CapturedArtifact {
    pub kind: ArtifactKind,
    pub filename: String,
    pub captured_at: DateTime<Local>,
    pub data: Bytes,
}

impl CapturedArtifact {
    pub fn new(kind: ArtifactKind, captured_at: DateTime<Local>, data: impl Into<Bytes>) -> Self {
        Self {
            kind,
            filename: artifact_filename(kind, &captured_at),
            captured_at,
            data: data.into(),
        }
    }

    pub fn receipt(&self) -> ArtifactReceipt {
        ArtifactReceipt {
            kind: self.kind,
            filename: self.filename.clone(),
            size_bytes: self.data.len() as u64,
        }
    }
}

/// What the controller reports back after handing an artifact off
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactReceipt {
    pub kind: ArtifactKind,
    pub filename: String,
    pub size_bytes: u64,
}

/// The download action
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    async fn deliver(&self, artifact: CapturedArtifact) -> Result<()>;
}

/// Writes artifacts into a local downloads directory
///
/// Name clashes get a ` (n)` suffix before the extension, the way browsers
/// name repeated downloads.
pub struct DownloadDirSink {
    dir: PathBuf,
}

impl DownloadDirSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `name.ext`, then `name (1).ext`, `name (2).ext`, ...
    fn candidate(&self, filename: &str, n: u32) -> PathBuf {
        if n == 0 {
            return self.dir.join(filename);
        }
        let name = match filename.rsplit_once('.') {
            Some((stem, ext)) => format!("{} ({}).{}", stem, n, ext),
            None => format!("{} ({})", filename, n),
        };
        self.dir.join(name)
    }

    /// Create the first free candidate. `create_new` makes the existence
    /// check and the creation one step, so an existing file is never replaced.
    async fn create_unique(&self, filename: &str) -> Result<(PathBuf, tokio::fs::File)> {
        let mut n = 0u32;
        loop {
            let path = self.candidate(filename, n);
            match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => n += 1,
                Err(e) => {
                    return Err(CaptureError::DeliveryFailed(format!(
                        "Failed to create {:?}: {}",
                        path, e
                    )))
                }
            }
        }
    }
}

#[async_trait]
impl ArtifactSink for DownloadDirSink {
    async fn deliver(&self, artifact: CapturedArtifact) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            CaptureError::DeliveryFailed(format!(
                "Failed to create download directory {:?}: {}",
                self.dir, e
            ))
        })?;

        let (path, mut file) = self.create_unique(&artifact.filename).await?;
        let written = async {
            file.write_all(&artifact.data).await?;
            file.flush().await
        };
        written.await.map_err(|e| {
            CaptureError::DeliveryFailed(format!("Failed to write {:?}: {}", path, e))
        })?;

        log::info!(
            "Saved {} ({} bytes) to {:?}",
            artifact.kind.mime(),
            artifact.data.len(),
            path
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 7, 9, 5, 2).unwrap()
    }

    #[test]
    fn test_filename_format() {
        let ts = fixed_time();
        assert_eq!(artifact_filename(ArtifactKind::Image, &ts), "2024-03-07_09-05-02.png");
        assert_eq!(artifact_filename(ArtifactKind::Video, &ts), "2024-03-07_09-05-02.webm");
    }

    #[test]
    fn test_receipt_reports_size() {
        let artifact = CapturedArtifact::new(ArtifactKind::Video, fixed_time(), vec![1u8, 2, 3]);
        let receipt = artifact.receipt();
        assert_eq!(receipt.size_bytes, 3);
        assert_eq!(receipt.filename, "2024-03-07_09-05-02.webm");
    }

    #[tokio::test]
    async fn test_download_dir_sink_writes_and_dedupes() {
        let dir = tempdir().unwrap();
        let sink = DownloadDirSink::new(dir.path().join("downloads"));

        for _ in 0..3 {
            let artifact = CapturedArtifact::new(ArtifactKind::Image, fixed_time(), vec![7u8; 4]);
            sink.deliver(artifact).await.unwrap();
        }

        let base = dir.path().join("downloads");
        assert!(base.join("2024-03-07_09-05-02.png").exists());
        assert!(base.join("2024-03-07_09-05-02 (1).png").exists());
        assert!(base.join("2024-03-07_09-05-02 (2).png").exists());
        assert_eq!(std::fs::read(base.join("2024-03-07_09-05-02.png")).unwrap(), vec![7u8; 4]);
    }

    #[tokio::test]
    async fn test_existing_file_is_never_replaced() {
        let dir = tempdir().unwrap();
        let taken = dir.path().join("2024-03-07_09-05-02.webm");
        std::fs::write(&taken, b"keep me").unwrap();

        let sink = DownloadDirSink::new(dir.path());
        let artifact = CapturedArtifact::new(ArtifactKind::Video, fixed_time(), vec![1u8, 2, 3]);
        sink.deliver(artifact).await.unwrap();

        assert_eq!(std::fs::read(&taken).unwrap(), b"keep me");
        assert_eq!(
            std::fs::read(dir.path().join("2024-03-07_09-05-02 (1).webm")).unwrap(),
            vec![1u8, 2, 3]
        );
    }

    #[test]
    fn test_candidate_names() {
        let sink = DownloadDirSink::new("/downloads");
        assert_eq!(sink.candidate("a.png", 0), PathBuf::from("/downloads/a.png"));
        assert_eq!(sink.candidate("a.png", 2), PathBuf::from("/downloads/a (2).png"));
        assert_eq!(sink.candidate("clip", 1), PathBuf::from("/downloads/clip (1)"));
    }
}
