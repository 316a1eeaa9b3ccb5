//! Manifest storage backends
//!
//! The manifest store never touches the filesystem directly; it is handed a
//! [`ManifestBackend`]. [`FsBackend`] writes one JSON file per target using
//! write-to-temp-then-rename. [`MemoryBackend`] keeps documents in process,
//! for embedding and tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

use super::lock::FileLock;
use crate::error::{GuardError, Result};

/// Identifies one target's manifest document
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ManifestLocation {
    /// Human-readable target name used in errors and logs
    pub target: String,
    /// Storage key; a file path for [`FsBackend`]
    pub path: PathBuf,
}

impl ManifestLocation {
    pub fn new(target: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            path: path.into(),
        }
    }

    pub(crate) fn persistence_failure(&self, source: std::io::Error) -> GuardError {
        GuardError::PersistenceFailure {
            target: self.target.clone(),
            path: self.path.clone(),
            source,
        }
    }
}

/// Storage for serialized manifests
///
/// Backends are shared with the commit task of an update, which outlives
/// the caller's future, hence `'static`.
#[async_trait]
pub trait ManifestBackend: Send + Sync + 'static {
    /// Raw manifest bytes, or `None` when no manifest exists yet
    async fn read(&self, location: &ManifestLocation) -> Result<Option<Vec<u8>>>;

    /// Replace the manifest. Readers must see either the old or the new
    /// document, never a partial one; on failure the old document stays.
    async fn write_atomic(&self, location: &ManifestLocation, contents: &[u8]) -> Result<()>;

    /// Cross-process exclusion for the read-modify-write cycle, if the
    /// backend needs one beyond the store's in-process lock
    async fn lock(&self, _location: &ManifestLocation) -> Result<Option<FileLock>> {
        Ok(None)
    }
}

/// JSON files on the local filesystem
#[derive(Debug, Clone)]
pub struct FsBackend {
    lock_timeout: Duration,
    stale_lock_after: Duration,
}

impl FsBackend {
    pub fn new(lock_timeout: Duration, stale_lock_after: Duration) -> Self {
        Self {
            lock_timeout,
            stale_lock_after,
        }
    }
}

impl Default for FsBackend {
    fn default() -> Self {
        Self::new(Duration::from_secs(30), Duration::from_secs(300))
    }
}

#[async_trait]
impl ManifestBackend for FsBackend {
    async fn read(&self, location: &ManifestLocation) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(&location.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(GuardError::StorageUnavailable {
                target: location.target.clone(),
                path: location.path.clone(),
                source,
            }),
        }
    }

    async fn write_atomic(&self, location: &ManifestLocation, contents: &[u8]) -> Result<()> {
        let path = &location.path;
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| location.persistence_failure(e))?;

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("manifest");
        let tmp_path = dir.join(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple()));

        // Removes the temp file on every early exit, including cancellation
        let tmp_guard = scopeguard::guard(tmp_path.clone(), |p| {
            let _ = std::fs::remove_file(p);
        });

        let mut file = tokio::fs::File::create(&tmp_path)
            .await
            .map_err(|e| location.persistence_failure(e))?;
        file.write_all(contents)
            .await
            .map_err(|e| location.persistence_failure(e))?;
        file.sync_all()
            .await
            .map_err(|e| location.persistence_failure(e))?;
        drop(file);

        tokio::fs::rename(&tmp_path, path)
            .await
            .map_err(|e| location.persistence_failure(e))?;
        scopeguard::ScopeGuard::into_inner(tmp_guard);

        debug!(path = %path.display(), bytes = contents.len(), "Manifest written");
        Ok(())
    }

    async fn lock(&self, location: &ManifestLocation) -> Result<Option<FileLock>> {
        FileLock::acquire(
            &location.target,
            &location.path,
            self.lock_timeout,
            self.stale_lock_after,
        )
        .await
        .map(Some)
    }
}

/// In-process key-value backend
#[derive(Debug, Default)]
pub struct MemoryBackend {
    documents: Mutex<HashMap<PathBuf, Vec<u8>>>,
    fail_writes: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store raw bytes for a key, bypassing the manifest store
    pub fn insert_raw(&self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) {
        self.documents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(path.into(), contents.into());
    }

    pub fn get_raw(&self, path: &Path) -> Option<Vec<u8>> {
        self.documents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(path)
            .cloned()
    }

    /// Make subsequent writes fail, as a full or read-only disk would
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ManifestBackend for MemoryBackend {
    async fn read(&self, location: &ManifestLocation) -> Result<Option<Vec<u8>>> {
        Ok(self.get_raw(&location.path))
    }

    async fn write_atomic(&self, location: &ManifestLocation, contents: &[u8]) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(location.persistence_failure(std::io::Error::new(
                std::io::ErrorKind::Other,
                "writes disabled",
            )));
        }
        self.insert_raw(location.path.clone(), contents);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn location(dir: &Path) -> ManifestLocation {
        ManifestLocation::new("hr", dir.join("prisma").join("migration-manifest.json"))
    }

    fn leftover_temp_files(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
                    .count()
            })
            .unwrap_or(0)
    }

    #[tokio::test]
    async fn test_fs_read_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FsBackend::default();
        assert!(backend.read(&location(dir.path())).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fs_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FsBackend::default();
        let loc = location(dir.path());

        backend.write_atomic(&loc, b"{\"a\":1}").await.unwrap();
        backend.write_atomic(&loc, b"{\"a\":2}").await.unwrap();

        assert_eq!(backend.read(&loc).await.unwrap().unwrap(), b"{\"a\":2}".to_vec());
        assert_eq!(leftover_temp_files(&dir.path().join("prisma")), 0);
    }

    #[tokio::test]
    async fn test_fs_failed_rename_keeps_target_and_cleans_temp() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FsBackend::default();
        let loc = location(dir.path());

        // A directory in the manifest's place makes the final rename fail
        std::fs::create_dir_all(&loc.path).unwrap();
        std::fs::write(loc.path.join("keep"), "x").unwrap();

        let err = backend.write_atomic(&loc, b"{}").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PersistenceFailure);
        assert!(loc.path.join("keep").exists());
        assert_eq!(leftover_temp_files(&dir.path().join("prisma")), 0);
    }

    #[tokio::test]
    async fn test_fs_read_of_directory_is_storage_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let loc = location(dir.path());
        std::fs::create_dir_all(&loc.path).unwrap();

        let err = FsBackend::default().read(&loc).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StorageUnavailable);
    }

    #[tokio::test]
    async fn test_memory_backend_failure_injection() {
        let backend = MemoryBackend::new();
        let loc = ManifestLocation::new("hr", "hr/manifest.json");
        backend.write_atomic(&loc, b"old").await.unwrap();

        backend.set_fail_writes(true);
        let err = backend.write_atomic(&loc, b"new").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PersistenceFailure);
        assert_eq!(backend.read(&loc).await.unwrap().unwrap(), b"old".to_vec());
        assert!(backend.lock(&loc).await.unwrap().is_none());
    }
}
