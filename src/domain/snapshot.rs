//! Schema snapshot types
//!
//! Plain data describing a model's shape at a point in time, plus the
//! caller-facing definitions they are built from. Definitions are validated
//! once, when converted into snapshots.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::checksum::compute_checksum;
use crate::error::{GuardError, Result};

/// Field data types understood by the compatibility matrix
///
/// Anything that is not a known scalar (enum types, relation targets,
/// composite types) is carried verbatim as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DataType {
    String,
    Boolean,
    Int,
    BigInt,
    Float,
    Decimal,
    DateTime,
    Json,
    Bytes,
    Other(String),
}

impl DataType {
    /// Parse from a type name (case-insensitive for known scalars)
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "string" => Self::String,
            "boolean" | "bool" => Self::Boolean,
            "int" | "integer" => Self::Int,
            "bigint" => Self::BigInt,
            "float" => Self::Float,
            "decimal" => Self::Decimal,
            "datetime" => Self::DateTime,
            "json" => Self::Json,
            "bytes" => Self::Bytes,
            _ => Self::Other(name.trim().to_string()),
        }
    }

    /// Canonical type name, as persisted in the manifest
    pub fn as_str(&self) -> &str {
        match self {
            Self::String => "String",
            Self::Boolean => "Boolean",
            Self::Int => "Int",
            Self::BigInt => "BigInt",
            Self::Float => "Float",
            Self::Decimal => "Decimal",
            Self::DateTime => "DateTime",
            Self::Json => "Json",
            Self::Bytes => "Bytes",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for DataType {
    fn from(value: String) -> Self {
        Self::from_name(&value)
    }
}

impl From<DataType> for String {
    fn from(value: DataType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One field of one model at a point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSnapshot {
    pub name: String,
    pub data_type: DataType,
    pub is_optional: bool,
}

impl FieldSnapshot {
    pub fn new(name: impl Into<String>, data_type: DataType, is_optional: bool) -> Self {
        Self {
            name: name.into(),
            data_type,
            is_optional,
        }
    }
}

/// A model's full field set plus its content checksum
///
/// Fields are kept sorted by name so the persisted form is stable no matter
/// what order the caller supplied them in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub fields: Vec<FieldSnapshot>,
    pub checksum: String,
}

impl ModelSnapshot {
    /// Build a snapshot from an unordered field set
    pub fn from_fields(mut fields: Vec<FieldSnapshot>) -> Self {
        fields.sort_by(|a, b| a.name.cmp(&b.name));
        let checksum = compute_checksum(&fields);
        Self { fields, checksum }
    }

    /// Build a snapshot from a caller definition, validating it first
    pub fn from_definition(definition: &ModelDefinition) -> Result<Self> {
        definition.validate()?;
        let fields = definition
            .fields
            .iter()
            .map(|f| FieldSnapshot::new(f.name.trim(), DataType::from_name(&f.data_type), f.is_optional))
            .collect();
        Ok(Self::from_fields(fields))
    }

    /// Field by name. Manifests loaded from disk may not be sorted.
    pub fn field(&self, name: &str) -> Option<&FieldSnapshot> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Fields keyed by name
    pub fn field_map(&self) -> BTreeMap<&str, &FieldSnapshot> {
        self.fields.iter().map(|f| (f.name.as_str(), f)).collect()
    }
}

/// A field as supplied by the code-generation pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub data_type: String,
    #[serde(default)]
    pub is_optional: bool,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, is_optional: bool) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            is_optional,
        }
    }

    /// Builder: required field
    pub fn required(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self::new(name, data_type, false)
    }

    /// Builder: optional field
    pub fn optional(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self::new(name, data_type, true)
    }
}

/// A model as supplied by the code-generation pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
}

impl ModelDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Builder: add a field
    pub fn with_field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    /// Builder: set the upstream model id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Reject missing names/types and duplicate field names
    pub fn validate(&self) -> Result<()> {
        let model = self.name.trim();
        if model.is_empty() {
            let hint = self
                .id
                .as_deref()
                .map(|id| format!(" (id {})", id))
                .unwrap_or_default();
            return Err(GuardError::invalid(format!("model{} has no name", hint)));
        }

        let mut seen = HashSet::new();
        for (idx, field) in self.fields.iter().enumerate() {
            let name = field.name.trim();
            if name.is_empty() {
                return Err(GuardError::invalid(format!(
                    "field #{} of model {} has no name",
                    idx, model
                )));
            }
            if field.data_type.trim().is_empty() {
                return Err(GuardError::invalid(format!(
                    "field {}.{} has no dataType",
                    model, name
                )));
            }
            if !seen.insert(name) {
                return Err(GuardError::invalid(format!(
                    "field {}.{} is declared more than once",
                    model, name
                )));
            }
        }

        Ok(())
    }
}

/// Convert a full model set into snapshots keyed by model name
///
/// The whole set is rejected if any definition is malformed or if two
/// definitions share a name.
pub fn build_snapshots(models: &[ModelDefinition]) -> Result<BTreeMap<String, ModelSnapshot>> {
    let mut snapshots = BTreeMap::new();
    for model in models {
        let snapshot = ModelSnapshot::from_definition(model)?;
        let name = model.name.trim().to_string();
        if snapshots.insert(name.clone(), snapshot).is_some() {
            return Err(GuardError::invalid(format!(
                "model {} is declared more than once",
                name
            )));
        }
    }
    Ok(snapshots)
}
