//! Migration safety analysis for generated database schemas.
//!
//! Each generation target keeps a manifest of the model snapshots it was last
//! generated from. Before regenerating, [`MigrationAnalyzer`] compares the
//! incoming models against that manifest and classifies every change by how
//! dangerous it is for existing data. After generation, [`ManifestStore`]
//! records the new baseline together with any fixes that were applied.

pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod observability;
pub mod services;

pub use config::GuardConfig;
pub use domain::{
    AppliedFix, ChangeRecord, DataType, FieldDefinition, Manifest, MigrationIssues,
    MigrationReport, ModelDefinition, Severity,
};
pub use error::{ErrorKind, GuardError, Result};
pub use services::{
    plan_default_fixes, AnalysisRequest, AnalyzerExtension, CallOptions, CancelHandle,
    ManifestStore, ManifestUpdate, MigrationAnalyzer,
};
