//! Migration analysis policy configuration.

use serde::{Deserialize, Serialize};

use crate::domain::{SeverityPolicy, TypeChangeOverride, TypeCompatibilityMatrix};

/// Analysis policy knobs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Treat destructive type changes as blocking (default: false, report only)
    #[serde(default)]
    pub destructive_type_changes_block: bool,

    /// Per-pair replacements for the built-in type compatibility table
    #[serde(default)]
    pub type_overrides: Vec<TypeChangeOverride>,
}

impl AnalysisConfig {
    pub fn severity_policy(&self) -> SeverityPolicy {
        SeverityPolicy {
            destructive_type_changes_block: self.destructive_type_changes_block,
        }
    }

    pub fn compatibility_matrix(&self) -> TypeCompatibilityMatrix {
        TypeCompatibilityMatrix::new().with_overrides(&self.type_overrides)
    }
}
