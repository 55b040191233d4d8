//! Upload Staging
//!
//! Holds an uploaded source image on disk for the lifetime of one request.
//! A [`StagedAsset`] deletes its file when discarded, and also when dropped,
//! so a cancelled request cannot leak into the staging directory.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tempfile::TempPath;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::config::ALLOWED_EXTENSIONS;
use crate::error::{CdnError, Result};

// == Source Validation ==
/// Accepts `.jpg`, `.jpeg` and `.png` uploads declared as `image/*`.
pub fn validate_source(file_name: &str, content_type: &str) -> Result<()> {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default();

    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) || !content_type.starts_with("image/") {
        return Err(CdnError::Validation("Invalid file type".to_string()));
    }
    Ok(())
}

// == Staging Area ==
/// Directory where uploads are spooled before processing.
#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
    max_bytes: usize,
}

impl StagingArea {
    // == Constructor ==
    /// Opens (creating if needed) the staging directory.
    pub async fn open(dir: impl Into<PathBuf>, max_bytes: usize) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        Ok(Self { dir, max_bytes })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Largest accepted upload in bytes.
    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    // == Begin ==
    /// Creates a uniquely named staging file, named `<unix millis>-<random>`.
    pub async fn begin(&self, content_type: impl Into<String>) -> Result<StagingWriter> {
        let dir = self.dir.clone();
        let prefix = format!("{}-", chrono::Utc::now().timestamp_millis());

        let temp = tokio::task::spawn_blocking(move || {
            tempfile::Builder::new()
                .prefix(&prefix)
                .rand_bytes(16)
                .tempfile_in(dir)
        })
        .await
        .map_err(|e| CdnError::Storage(std::io::Error::other(e)))??;

        let (file, path) = temp.into_parts();

        Ok(StagingWriter {
            file: File::from_std(file),
            path,
            hasher: Sha256::new(),
            size: 0,
            max_bytes: self.max_bytes,
            content_type: content_type.into(),
        })
    }

    // == Stage ==
    /// Stages an in-memory upload in one step.
    pub async fn stage(&self, content_type: &str, bytes: &[u8]) -> Result<StagedAsset> {
        let mut writer = self.begin(content_type).await?;
        writer.write_chunk(bytes).await?;
        writer.finish().await
    }
}

// == Staging Writer ==
/// Streams upload chunks to disk while hashing them.
///
/// Dropping an unfinished writer removes the partial file.
pub struct StagingWriter {
    file: File,
    path: TempPath,
    hasher: Sha256,
    size: usize,
    max_bytes: usize,
    content_type: String,
}

impl StagingWriter {
    /// Appends a chunk. Fails with [`CdnError::PayloadTooLarge`] once the
    /// running total exceeds the limit.
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        self.size += chunk.len();
        if self.size > self.max_bytes {
            return Err(CdnError::PayloadTooLarge(self.max_bytes));
        }

        self.hasher.update(chunk);
        self.file.write_all(chunk).await?;
        Ok(())
    }

    /// Flushes the file and returns the staged asset.
    pub async fn finish(mut self) -> Result<StagedAsset> {
        self.file.flush().await?;
        self.file.sync_data().await?;

        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let identity = hex::encode(self.hasher.finalize());

        debug!(
            "Staged {} ({} bytes, {})",
            file_name, self.size, self.content_type
        );

        Ok(StagedAsset {
            path: self.path,
            file_name,
            size: self.size,
            content_type: self.content_type,
            identity,
        })
    }
}

// == Staged Asset ==
/// A source image resident in the staging directory.
#[derive(Debug)]
pub struct StagedAsset {
    path: TempPath,
    file_name: String,
    size: usize,
    content_type: String,
    identity: String,
}

impl StagedAsset {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Unique staging filename.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Size in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Content type declared by the client.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Hex SHA-256 of the staged bytes; identical uploads share it.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Reads the staged bytes.
    pub async fn read(&self) -> Result<Vec<u8>> {
        Ok(fs::read(&self.path).await?)
    }

    // == Discard ==
    /// Deletes the staged file. Failures are logged, never returned.
    pub async fn discard(self) {
        let path = match self.path.keep() {
            Ok(path) => path,
            Err(e) => {
                // The TempPath inside the error still removes the file on drop
                warn!("Failed to release staged asset {}: {}", self.file_name, e);
                return;
            }
        };

        match fs::remove_file(&path).await {
            Ok(()) => debug!("Removed staged asset {}", self.file_name),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to delete staged asset {}: {}", path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staged_files(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn test_validate_source() {
        assert!(validate_source("cat.png", "image/png").is_ok());
        assert!(validate_source("CAT.JPG", "image/jpeg").is_ok());
        assert!(validate_source("photo.jpeg", "image/jpeg").is_ok());

        for (name, mime) in [
            ("cat.gif", "image/gif"),
            ("cat.png", "text/plain"),
            ("cat", "image/png"),
            ("cat.png.exe", "image/png"),
            ("", "image/png"),
        ] {
            assert!(
                matches!(validate_source(name, mime), Err(CdnError::Validation(_))),
                "Should reject {name:?} as {mime:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_stage_records_size_and_identity() {
        let dir = tempfile::tempdir().unwrap();
        let area = StagingArea::open(dir.path(), 1024).await.unwrap();

        let asset = area.stage("image/png", b"hello world").await.unwrap();

        assert_eq!(asset.size(), 11);
        assert_eq!(asset.content_type(), "image/png");
        assert_eq!(
            asset.identity(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
        assert_eq!(asset.read().await.unwrap(), b"hello world");
        assert!(asset.path().starts_with(dir.path()));
    }

    #[tokio::test]
    async fn test_unique_file_names() {
        let dir = tempfile::tempdir().unwrap();
        let area = StagingArea::open(dir.path(), 1024).await.unwrap();

        let a = area.stage("image/png", b"same").await.unwrap();
        let b = area.stage("image/png", b"same").await.unwrap();

        assert_ne!(a.file_name(), b.file_name());
        assert_eq!(a.identity(), b.identity());
        assert!(a.file_name().contains('-'));
    }

    #[tokio::test]
    async fn test_discard_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let area = StagingArea::open(dir.path(), 1024).await.unwrap();

        let asset = area.stage("image/jpeg", b"bytes").await.unwrap();
        assert_eq!(staged_files(dir.path()), 1);

        asset.discard().await;
        assert_eq!(staged_files(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_drop_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let area = StagingArea::open(dir.path(), 1024).await.unwrap();

        let asset = area.stage("image/jpeg", b"bytes").await.unwrap();
        drop(asset);

        assert_eq!(staged_files(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_oversized_upload_rejected_and_removed() {
        let dir = tempfile::tempdir().unwrap();
        let area = StagingArea::open(dir.path(), 4).await.unwrap();

        let mut writer = area.begin("image/png").await.unwrap();
        writer.write_chunk(b"abc").await.unwrap();
        let result = writer.write_chunk(b"de").await;
        assert!(matches!(result, Err(CdnError::PayloadTooLarge(4))));

        drop(writer);
        assert_eq!(staged_files(dir.path()), 0);
    }
}
