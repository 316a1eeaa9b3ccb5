//! Cross-process exclusive lock files
//!
//! A writer owns a target while `<manifest>.lock` exists. The file is created
//! with `create_new`, so only one process can hold it, and it carries a
//! unique owner line. A lock older than the configured stale age is assumed
//! to belong to a crashed writer. Reclaiming moves it aside under a unique
//! name first and only discards it if it is still the same stale file; a
//! fresh lock moved aside by a racing waiter is linked back in place.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{GuardError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Held lock; released on drop
#[derive(Debug)]
pub struct FileLock {
    path: PathBuf,
    owner: String,
}

impl FileLock {
    /// Lock file path for a manifest path
    pub fn path_for(manifest_path: &Path) -> PathBuf {
        let mut name = manifest_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        manifest_path.with_file_name(name)
    }

    /// Wait up to `timeout` for the lock guarding `manifest_path`
    pub async fn acquire(
        target: &str,
        manifest_path: &Path,
        timeout: Duration,
        stale_after: Duration,
    ) -> Result<Self> {
        let path = Self::path_for(manifest_path);
        let persist_err = |source: std::io::Error| GuardError::PersistenceFailure {
            target: target.to_string(),
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(persist_err)?;
        }

        let owner = format!("pid={} owner={}\n", std::process::id(), Uuid::new_v4().simple());
        let start = Instant::now();
        loop {
            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(mut file) => {
                    // Without the owner line nobody could release or reclaim it safely
                    let written = match file.write_all(owner.as_bytes()).await {
                        Ok(()) => file.flush().await,
                        Err(e) => Err(e),
                    };
                    if let Err(e) = written {
                        drop(file);
                        let _ = tokio::fs::remove_file(&path).await;
                        return Err(persist_err(e));
                    }
                    debug!(lock = %path.display(), "Acquired manifest lock");
                    return Ok(Self {
                        path: path.clone(),
                        owner,
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    if let Some(stale_owner) = stale_owner(&path, stale_after).await {
                        if reclaim_stale(&path, &stale_owner, stale_after).await {
                            warn!(lock = %path.display(), "Reclaimed stale manifest lock");
                        }
                        continue;
                    }
                    if start.elapsed() >= timeout {
                        return Err(GuardError::Timeout {
                            operation: format!("Waiting for manifest lock {}", path.display()),
                            target: target.to_string(),
                            after: timeout,
                        });
                    }
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
                Err(e) => return Err(persist_err(e)),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) if contents == self.owner => {
                if let Err(e) = std::fs::remove_file(&self.path) {
                    warn!(lock = %self.path.display(), error = %e, "Failed to remove manifest lock");
                }
            }
            Ok(_) => {
                warn!(lock = %self.path.display(), "Manifest lock was reclaimed by another writer")
            }
            Err(e) => {
                warn!(lock = %self.path.display(), error = %e, "Manifest lock vanished before release")
            }
        }
    }
}

/// Owner line of the lock at `path` if it is older than `stale_after`
async fn stale_owner(path: &Path, stale_after: Duration) -> Option<String> {
    if !is_stale(path, stale_after).await {
        return None;
    }
    tokio::fs::read_to_string(path).await.ok()
}

/// Remove the stale lock `expected_owner` at `path`, and nothing else.
///
/// Returns true if this call discarded it. A concurrent waiter may already
/// have reclaimed it and taken a fresh lock; that lock is restored.
async fn reclaim_stale(path: &Path, expected_owner: &str, stale_after: Duration) -> bool {
    let mut parked_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    parked_name.push(format!(".{}.stale", Uuid::new_v4().simple()));
    let parked = path.with_file_name(parked_name);

    if tokio::fs::rename(path, &parked).await.is_err() {
        return false;
    }

    let contents = tokio::fs::read_to_string(&parked).await.unwrap_or_default();
    if contents == expected_owner && is_stale(&parked, stale_after).await {
        let _ = tokio::fs::remove_file(&parked).await;
        return true;
    }

    // hard_link never replaces an existing lock file
    if let Err(e) = tokio::fs::hard_link(&parked, path).await {
        warn!(lock = %path.display(), error = %e, "Could not restore live manifest lock");
    }
    let _ = tokio::fs::remove_file(&parked).await;
    false
}

async fn is_stale(path: &Path, stale_after: Duration) -> bool {
    let Ok(metadata) = tokio::fs::metadata(path).await else {
        return false;
    };
    metadata
        .modified()
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .map(|age| age > stale_after)
        .unwrap_or(false)
}
