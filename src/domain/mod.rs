//! Domain layer - pure business logic
//!
//! This module contains business logic with no external I/O.
//! Types and functions here can be unit tested without mocking.

pub mod checksum;
pub mod compatibility;
pub mod diff;
pub mod manifest;
pub mod report;
pub mod snapshot;

// Re-export commonly used types
pub use checksum::compute_checksum;
pub use compatibility::{TypeChangeOverride, TypeChangeSeverity, TypeCompatibilityMatrix};
pub use diff::{diff_manifest, SeverityPolicy};
pub use manifest::{AppliedFix, Manifest, MergeOutcome};
pub use report::{
    ChangeKind, ChangeRecord, MigrationIssues, MigrationReport, ReportSummary, Severity,
    MADE_OPTIONAL,
};
pub use snapshot::{
    build_snapshots, DataType, FieldDefinition, FieldSnapshot, ModelDefinition, ModelSnapshot,
};
