//! Field type transition classification
//!
//! A static table of `(from, to)` data type pairs. Pairs missing from the
//! table are destructive: an unknown transition is never treated as safe.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::snapshot::DataType;

/// Risk of changing a column from one data type to another
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeChangeSeverity {
    /// Lossless widening, no report entry
    Safe,
    /// Plausible but potentially lossy
    Warning,
    /// Very likely to corrupt or fail to migrate existing data
    Destructive,
}

impl TypeChangeSeverity {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Warning => "warning",
            Self::Destructive => "destructive",
        }
    }
}

/// A single override of the built-in table, usually loaded from config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeChangeOverride {
    pub from: DataType,
    pub to: DataType,
    pub severity: TypeChangeSeverity,
}

/// Classification table with optional per-pair overrides
#[derive(Debug, Clone, Default)]
pub struct TypeCompatibilityMatrix {
    overrides: HashMap<(DataType, DataType), TypeChangeSeverity>,
}

impl TypeCompatibilityMatrix {
    /// The built-in table with no overrides
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: replace the built-in classification for the given pairs
    pub fn with_overrides<'a>(mut self, overrides: impl IntoIterator<Item = &'a TypeChangeOverride>) -> Self {
        for o in overrides {
            self.overrides
                .insert((o.from.clone(), o.to.clone()), o.severity);
        }
        self
    }

    /// Classify a transition. Identical types are always safe.
    pub fn classify(&self, from: &DataType, to: &DataType) -> TypeChangeSeverity {
        if from == to {
            return TypeChangeSeverity::Safe;
        }
        if let Some(severity) = self.overrides.get(&(from.clone(), to.clone())) {
            return *severity;
        }
        builtin_classification(from, to)
    }
}

fn builtin_classification(from: &DataType, to: &DataType) -> TypeChangeSeverity {
    use DataType::*;

    match (from, to) {
        // Lossless widenings
        (Int, BigInt) | (Int, Float) | (Int, Decimal) | (BigInt, Decimal) => {
            TypeChangeSeverity::Safe
        }
        // Convertible in place, but precision or range may be lost
        (Decimal, Float)
        | (Float, Decimal)
        | (BigInt, Int)
        | (BigInt, Float)
        | (Float, Int)
        | (Decimal, Int)
        | (Decimal, BigInt)
        | (Boolean, Int) => TypeChangeSeverity::Warning,
        _ => TypeChangeSeverity::Destructive,
    }
}
