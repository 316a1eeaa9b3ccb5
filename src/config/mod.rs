//! # Guard Configuration
//!
//! Optional per-target configuration, loaded from YAML.
//!
//! ## Configuration File
//!
//! `{target}/migration-guard.yaml` (or an explicit `--config` path):
//!
//! ```yaml
//! manifest:
//!   dir: prisma
//!   file_name: migration-manifest.json
//!   lock_timeout_secs: 30
//! analysis:
//!   destructive_type_changes_block: false
//!   type_overrides:
//!     - { from: Decimal, to: String, severity: warning }
//! operation_timeout_secs: 60
//! ```
//!
//! Every key is optional; a missing file means all defaults.

mod manifest;
mod migration;

pub use manifest::ManifestConfig;
pub use migration::AnalysisConfig;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{GuardError, Result};

/// Default config file name looked up in a target root
pub const CONFIG_FILE_NAME: &str = "migration-guard.yaml";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Manifest location and locking
    #[serde(default)]
    pub manifest: ManifestConfig,

    /// Severity policy and type overrides
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Upper bound for a single load/update (default: none)
    #[serde(default)]
    pub operation_timeout_secs: Option<u64>,
}

impl GuardConfig {
    /// Load configuration from an explicit file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| GuardError::Config {
            path: path.to_path_buf(),
            message: format!("failed to read: {}", e),
        })?;
        Self::parse(&content, path)
    }

    /// Load `{target_root}/migration-guard.yaml`, or defaults when absent
    pub fn load_for_target(target_root: &Path) -> Result<Self> {
        let path = config_path(target_root);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse YAML content; `origin` is only used in error messages
    pub fn parse(content: &str, origin: &Path) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content).map_err(|e| GuardError::Config {
            path: origin.to_path_buf(),
            message: format!("failed to parse: {}", e),
        })?;
        config.validate(origin)?;
        Ok(config)
    }

    fn validate(&self, origin: &Path) -> Result<()> {
        let invalid = |message: &str| GuardError::Config {
            path: origin.to_path_buf(),
            message: message.to_string(),
        };

        if self.manifest.file_name.trim().is_empty() {
            return Err(invalid("manifest.file_name cannot be empty"));
        }
        if self.manifest.file_name.contains('/') || self.manifest.file_name.contains('\\') {
            return Err(invalid("manifest.file_name must be a plain file name"));
        }
        if self.operation_timeout_secs == Some(0) {
            return Err(invalid("operation_timeout_secs must be greater than zero"));
        }
        Ok(())
    }

    pub fn operation_timeout(&self) -> Option<Duration> {
        self.operation_timeout_secs.map(Duration::from_secs)
    }
}

/// Resolve the default config path for a target root
pub fn config_path(target_root: &Path) -> PathBuf {
    target_root.join(CONFIG_FILE_NAME)
}
