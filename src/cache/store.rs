//! Cache Store Module
//!
//! Flat, filesystem-backed storage of transformed renditions. An entry is
//! valid exactly when its file exists; there is no index or sidecar.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::cache::{CacheStats, PathGuard};
use crate::error::{CdnError, Result};

// == Cache Store ==
/// Disk cache rooted at a single directory.
#[derive(Debug)]
pub struct CacheStore {
    /// Confines every key to the root
    guard: PathGuard,
    /// Performance statistics
    stats: CacheStats,
}

impl CacheStore {
    // == Constructor ==
    /// Opens (creating if needed) the cache directory at `root`.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        fs::create_dir_all(root.as_ref()).await?;
        Ok(Self {
            guard: PathGuard::new(root)?,
            stats: CacheStats::new(),
        })
    }

    /// Returns the absolute cache root.
    pub fn root(&self) -> &Path {
        self.guard.root()
    }

    /// Returns the shared counters.
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Resolves `key` through the path guard.
    pub fn resolve(&self, key: &str) -> Result<PathBuf> {
        self.guard.resolve(key)
    }

    // == Exists ==
    /// Returns true iff a regular file named `key` is present.
    pub async fn exists(&self, key: &str) -> Result<bool> {
        let path = self.resolve(key)?;
        match fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    // == Read ==
    /// Returns the bytes stored under `key`, or `None` on a miss.
    ///
    /// Symlinks are refused rather than followed.
    pub async fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.resolve(key)?;

        let meta = match fs::symlink_metadata(&path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if meta.file_type().is_symlink() {
            warn!("Refusing to serve symlinked cache entry {}", key);
            return Err(CdnError::AccessDenied(key.to_string()));
        }
        if !meta.is_file() {
            return Ok(None);
        }

        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            // Evicted between the stat and the read
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    // == Write ==
    /// Persists `bytes` under `key`.
    ///
    /// The data lands in a hidden temp file first and is renamed into place,
    /// so a reader sees either nothing or the complete entry.
    pub async fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.resolve(key)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let tmp = path.with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple()));

        if let Err(e) = fs::write(&tmp, bytes).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        debug!("Cached {} ({} bytes)", key, bytes.len());
        Ok(())
    }

    // == Remove ==
    /// Deletes the entry. Returns false if it was already gone.
    pub async fn remove(&self, key: &str) -> Result<bool> {
        let path = self.resolve(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    // == Modified ==
    /// Returns the entry's modification time, or `None` if it is gone.
    pub async fn modified(&self, key: &str) -> Result<Option<SystemTime>> {
        let path = self.resolve(key)?;
        match fs::symlink_metadata(&path).await {
            Ok(meta) => Ok(Some(meta.modified()?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    // == List ==
    /// Lists the names of all regular files in the root, temp files included.
    pub async fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut dir = fs::read_dir(self.root()).await?;

        while let Some(entry) = dir.next_entry().await? {
            match entry.file_type().await {
                Ok(ft) if ft.is_file() => {}
                Ok(_) => continue,
                Err(e) => {
                    warn!("Skipping unreadable cache entry {:?}: {}", entry.file_name(), e);
                    continue;
                }
            }

            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(raw) => warn!("Skipping non UTF-8 cache entry {:?}", raw),
            }
        }

        Ok(names)
    }
}
