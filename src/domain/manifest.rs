//! Persisted schema manifest
//!
//! One manifest per generation target records the last-applied snapshot of
//! every model plus the full history of automatic fixes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::snapshot::ModelSnapshot;

/// Record of one automatic remediation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedFix {
    pub model: String,
    pub field: String,
    pub fix: String,
}

impl AppliedFix {
    pub fn new(model: impl Into<String>, field: impl Into<String>, fix: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            field: field.into(),
            fix: fix.into(),
        }
    }
}

/// Root object persisted for one generation target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub microservice_name: String,
    #[serde(default)]
    pub models: BTreeMap<String, ModelSnapshot>,
    #[serde(default)]
    pub auto_fixes_applied: Vec<AppliedFix>,
    /// Number of successful updates; absent in manifests written before it existed
    #[serde(default)]
    pub revision: u64,
}

/// What changed in the manifest during one merge
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub inserted: Vec<String>,
    pub replaced: Vec<String>,
    pub unchanged: Vec<String>,
    pub fixes_appended: usize,
}

impl Manifest {
    pub fn new(microservice_name: impl Into<String>) -> Self {
        Self {
            microservice_name: microservice_name.into(),
            models: BTreeMap::new(),
            auto_fixes_applied: Vec::new(),
            revision: 0,
        }
    }

    /// Upsert snapshots by model name and append fix history.
    ///
    /// Models not present in `snapshots` are left untouched. Fixes are
    /// appended as-is, never deduplicated.
    pub fn merge(
        &mut self,
        snapshots: BTreeMap<String, ModelSnapshot>,
        applied_fixes: Vec<AppliedFix>,
    ) -> MergeOutcome {
        let mut outcome = MergeOutcome {
            fixes_appended: applied_fixes.len(),
            ..Default::default()
        };

        for (name, snapshot) in snapshots {
            match self.models.get(&name) {
                None => outcome.inserted.push(name.clone()),
                Some(existing) if existing.checksum == snapshot.checksum => {
                    outcome.unchanged.push(name.clone())
                }
                Some(_) => outcome.replaced.push(name.clone()),
            }
            self.models.insert(name, snapshot);
        }

        self.auto_fixes_applied.extend(applied_fixes);
        self.revision += 1;
        outcome
    }

    pub fn checksum_of(&self, model: &str) -> Option<&str> {
        self.models.get(model).map(|m| m.checksum.as_str())
    }
}
