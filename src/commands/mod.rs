//! Subcommand handlers
//!
//! Each handler loads its inputs, calls into the library and renders the
//! result. Library errors are wrapped with `anyhow` context here.

pub mod analyze;
pub mod checksum;
pub mod show;
pub mod update;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use migration_guard::{GuardConfig, ManifestStore, ModelDefinition};

/// Global options shared by every subcommand
pub struct RunContext {
    pub config: Option<PathBuf>,
    pub timeout: Option<Duration>,
}

impl RunContext {
    /// Explicit `--config` wins, then `<target>/migration-guard.yaml`, then defaults
    pub fn load_config(&self, target: &Path) -> Result<GuardConfig> {
        let config = match &self.config {
            Some(path) => GuardConfig::load(path)?,
            None => GuardConfig::load_for_target(target)?,
        };
        Ok(config)
    }

    pub fn store(&self, config: &GuardConfig) -> ManifestStore {
        let store = ManifestStore::from_config(config);
        match self.timeout {
            Some(timeout) => store.with_timeout(Some(timeout)),
            None => store,
        }
    }
}

/// Read a JSON or YAML document, chosen by file extension
pub async fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    if is_yaml(path) {
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {} as YAML", path.display()))
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {} as JSON", path.display()))
    }
}

pub async fn read_models(path: &Path) -> Result<Vec<ModelDefinition>> {
    read_document(path).await
}

/// Write a document as JSON or YAML, chosen by file extension
pub async fn write_document<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = if is_yaml(path) {
        serde_yaml::to_string(value)
            .with_context(|| format!("Failed to serialize {} as YAML", path.display()))?
    } else {
        let mut json = serde_json::to_string_pretty(value)
            .with_context(|| format!("Failed to serialize {} as JSON", path.display()))?;
        json.push('\n');
        json
    };
    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}
