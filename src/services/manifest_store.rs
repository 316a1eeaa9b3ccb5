//! Manifest store - loads and updates per-target schema manifests
//!
//! Updates for the same target are serialized twice over: an in-process
//! async mutex keyed by manifest path, and whatever cross-process lock the
//! backend provides (a lock file for [`FsBackend`]). Reads take no lock;
//! atomic writes guarantee a reader sees either the old or the new manifest.
//!
//! An update runs in two phases. Preparing (lock wait, read, merge) honours
//! cancellation and timeouts. Committing (the atomic write) runs on its own
//! task that keeps both locks until the write has finished, so `Cancelled`
//! and `Timeout` always mean nothing was persisted, and a dropped caller
//! never lets a second writer in mid-write.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, info, warn};

use super::cancel::{run_guarded, CallOptions};
use crate::config::{GuardConfig, ManifestConfig};
use crate::domain::{build_snapshots, AppliedFix, Manifest, MergeOutcome, ModelDefinition};
use crate::error::{GuardError, Result};
use crate::infrastructure::{FileLock, FsBackend, ManifestBackend, ManifestLocation};
use crate::observability::{emit_event, EventMetadata, GuardEvent, ManifestUpdatedEvent, StepTimer};

/// Input to [`ManifestStore::update_manifest`]
#[derive(Debug, Clone)]
pub struct ManifestUpdate {
    /// Generation target root
    pub target: PathBuf,
    pub microservice: String,
    pub models: Vec<ModelDefinition>,
    pub applied_fixes: Vec<AppliedFix>,
}

impl ManifestUpdate {
    pub fn new(
        target: impl Into<PathBuf>,
        microservice: impl Into<String>,
        models: Vec<ModelDefinition>,
    ) -> Self {
        Self {
            target: target.into(),
            microservice: microservice.into(),
            models,
            applied_fixes: Vec::new(),
        }
    }

    /// Builder: record fixes applied since the last update
    pub fn with_applied_fixes(mut self, fixes: Vec<AppliedFix>) -> Self {
        self.applied_fixes = fixes;
        self
    }
}

/// Per-target manifest persistence
pub struct ManifestStore<B: ManifestBackend = FsBackend> {
    backend: Arc<B>,
    config: ManifestConfig,
    timeout: Option<Duration>,
    writers: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl ManifestStore<FsBackend> {
    /// Filesystem-backed store configured from a [`GuardConfig`]
    pub fn from_config(config: &GuardConfig) -> Self {
        let backend = FsBackend::new(
            config.manifest.lock_timeout(),
            config.manifest.stale_lock_after(),
        );
        Self::with_backend(backend, config.manifest.clone()).with_timeout(config.operation_timeout())
    }
}

impl<B: ManifestBackend> ManifestStore<B> {
    pub fn with_backend(backend: B, config: ManifestConfig) -> Self {
        Self {
            backend: Arc::new(backend),
            config,
            timeout: None,
            writers: Mutex::new(HashMap::new()),
        }
    }

    /// Builder: default timeout applied to calls without explicit options
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn backend(&self) -> &B {
        self.backend.as_ref()
    }

    /// Where the manifest for `target` is stored
    pub fn location(&self, target: &Path) -> ManifestLocation {
        ManifestLocation::new(
            target.display().to_string(),
            self.config.manifest_path(target),
        )
    }

    pub(crate) fn default_options(&self) -> CallOptions {
        CallOptions {
            timeout: self.timeout,
            cancel: None,
        }
    }

    /// Load the manifest for `target`; `None` means first generation
    pub async fn load_manifest(&self, target: &Path) -> Result<Option<Manifest>> {
        self.load_manifest_with(target, &self.default_options()).await
    }

    pub async fn load_manifest_with(
        &self,
        target: &Path,
        options: &CallOptions,
    ) -> Result<Option<Manifest>> {
        let location = self.location(target);
        run_guarded("Manifest load", &location.target, options, self.read(&location)).await
    }

    async fn read(&self, location: &ManifestLocation) -> Result<Option<Manifest>> {
        let Some(bytes) = self.backend.read(location).await? else {
            debug!(path = %location.path.display(), "No manifest found");
            return Ok(None);
        };

        let manifest: Manifest =
            serde_json::from_slice(&bytes).map_err(|e| GuardError::CorruptManifest {
                target: location.target.clone(),
                path: location.path.clone(),
                message: e.to_string(),
            })?;

        debug!(
            path = %location.path.display(),
            revision = manifest.revision,
            models = manifest.models.len(),
            "Loaded manifest"
        );
        Ok(Some(manifest))
    }

    /// Merge new snapshots and fix history into the target's manifest
    pub async fn update_manifest(&self, update: ManifestUpdate) -> Result<Manifest> {
        self.update_manifest_with(update, &self.default_options()).await
    }

    pub async fn update_manifest_with(
        &self,
        update: ManifestUpdate,
        options: &CallOptions,
    ) -> Result<Manifest> {
        let microservice = update.microservice.trim().to_string();
        if microservice.is_empty() {
            return Err(GuardError::invalid("microservice name is empty"));
        }
        validate_fixes(&update.applied_fixes)?;
        let snapshots = build_snapshots(&update.models)?;

        let location = self.location(&update.target);
        let applied_fixes = update.applied_fixes;
        let timer = StepTimer::start();

        let prepared = run_guarded("Manifest update", &location.target, options, async {
            let writer = self.writer_lock(&location.path);
            let local = writer.lock_owned().await;
            let cross_process = self.backend.lock(&location).await?;

            let mut manifest = match self.read(&location).await? {
                Some(existing) => existing,
                None => {
                    info!(root = %location.target, "Creating manifest");
                    Manifest::new(&microservice)
                }
            };

            if manifest.microservice_name != microservice {
                warn!(
                    root = %location.target,
                    stored = %manifest.microservice_name,
                    supplied = %microservice,
                    "Microservice name changed; updating manifest"
                );
                manifest.microservice_name = microservice.clone();
            }

            let outcome = manifest.merge(snapshots, applied_fixes);

            let mut bytes = serde_json::to_vec_pretty(&manifest).map_err(|e| {
                location.persistence_failure(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
            })?;
            bytes.push(b'\n');

            Ok(PreparedUpdate {
                manifest,
                outcome,
                bytes,
                locks: (local, cross_process),
            })
        })
        .await?;

        let PreparedUpdate {
            manifest,
            outcome,
            bytes,
            locks,
        } = prepared;
        self.commit(&location, bytes, locks).await?;

        info!(
            root = %location.target,
            revision = manifest.revision,
            inserted = outcome.inserted.len(),
            replaced = outcome.replaced.len(),
            unchanged = outcome.unchanged.len(),
            fixes_appended = outcome.fixes_appended,
            "Manifest updated"
        );
        emit_event(GuardEvent::ManifestUpdated(ManifestUpdatedEvent::from_outcome(
            EventMetadata::new(&location.target, &microservice),
            manifest.revision,
            &outcome,
            timer.elapsed_secs(),
        )));

        Ok(manifest)
    }

    /// Write on a detached task that holds `locks` until the write settles
    async fn commit(
        &self,
        location: &ManifestLocation,
        bytes: Vec<u8>,
        locks: WriterLocks,
    ) -> Result<()> {
        let backend = Arc::clone(&self.backend);
        let task_location = location.clone();
        let task = tokio::spawn(async move {
            let result = backend.write_atomic(&task_location, &bytes).await;
            drop(locks);
            result
        });

        match task.await {
            Ok(result) => result,
            Err(e) => Err(location.persistence_failure(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("manifest write task failed: {}", e),
            ))),
        }
    }

    /// In-process writer lock for one manifest path
    fn writer_lock(&self, path: &Path) -> Arc<tokio::sync::Mutex<()>> {
        let mut writers = self
            .writers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // Drop entries nobody is holding or waiting on
        writers.retain(|_, lock| Arc::strong_count(lock) > 1);
        writers
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}

type WriterLocks = (tokio::sync::OwnedMutexGuard<()>, Option<FileLock>);

struct PreparedUpdate {
    manifest: Manifest,
    outcome: MergeOutcome,
    bytes: Vec<u8>,
    locks: WriterLocks,
}

fn validate_fixes(fixes: &[AppliedFix]) -> Result<()> {
    for (idx, fix) in fixes.iter().enumerate() {
        if fix.model.trim().is_empty() || fix.field.trim().is_empty() || fix.fix.trim().is_empty() {
            return Err(GuardError::invalid(format!(
                "applied fix #{} needs a model, a field and a fix identifier",
                idx
            )));
        }
    }
    Ok(())
}
