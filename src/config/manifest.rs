//! Manifest location and locking configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Where a target's manifest lives and how writers coordinate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestConfig {
    /// Directory under the target root holding the manifest (default: "prisma")
    #[serde(default = "default_manifest_dir")]
    pub dir: String,

    /// Manifest file name (default: "migration-manifest.json")
    #[serde(default = "default_manifest_file")]
    pub file_name: String,

    /// How long an update waits for another writer's lock (default: 30)
    #[serde(default = "default_lock_timeout_secs")]
    pub lock_timeout_secs: u64,

    /// Age after which a lock file left by a crashed writer is reclaimed (default: 300)
    #[serde(default = "default_stale_lock_secs")]
    pub stale_lock_secs: u64,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            dir: default_manifest_dir(),
            file_name: default_manifest_file(),
            lock_timeout_secs: default_lock_timeout_secs(),
            stale_lock_secs: default_stale_lock_secs(),
        }
    }
}

impl ManifestConfig {
    /// Full manifest path for a target root
    pub fn manifest_path(&self, target_root: &Path) -> PathBuf {
        target_root.join(&self.dir).join(&self.file_name)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_secs)
    }

    pub fn stale_lock_after(&self) -> Duration {
        Duration::from_secs(self.stale_lock_secs)
    }
}

fn default_manifest_dir() -> String {
    "prisma".to_string()
}

fn default_manifest_file() -> String {
    "migration-manifest.json".to_string()
}

fn default_lock_timeout_secs() -> u64 {
    30
}

fn default_stale_lock_secs() -> u64 {
    300
}
