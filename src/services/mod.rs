//! Services layer - orchestration logic
//!
//! This module coordinates between domain logic and infrastructure.
//! Services use infrastructure adapters to perform I/O operations.

pub mod analyzer;
pub mod autofix;
pub mod cancel;
pub mod manifest_store;

// Re-export commonly used types
pub use analyzer::{AnalysisRequest, AnalyzerExtension, MigrationAnalyzer};
pub use autofix::{plan_default_fixes, FixPlan};
pub use cancel::{run_guarded, CallOptions, CancelHandle};
pub use manifest_store::{ManifestStore, ManifestUpdate};
