//! Migration report types
//!
//! The analyzer's output. Transient: reports are handed to the caller and
//! never persisted.

use serde::{Deserialize, Serialize};

use super::snapshot::DataType;

/// Fix identifier recorded when a new required field is relaxed to optional
pub const MADE_OPTIONAL: &str = "made_optional";

/// Severity of a single change record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Purely additive change
    Safe,
    /// Informational only, never blocks
    Info,
    /// Can be repaired automatically
    Fixable,
    /// Potentially lossy, needs review
    Warning,
    /// Very likely to corrupt existing data, needs review
    Destructive,
    /// Blocks deployment
    Dangerous,
}

impl Severity {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Info => "info",
            Self::Fixable => "fixable",
            Self::Warning => "warning",
            Self::Destructive => "destructive",
            Self::Dangerous => "dangerous",
        }
    }

    /// Whether this severity counts toward `has_non_safe_issues`
    pub fn is_non_safe(&self) -> bool {
        !matches!(self, Self::Safe | Self::Info)
    }
}

/// What kind of change a record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    ModelAdded,
    ModelRemoved,
    FieldRemoved,
    RequiredFieldAdded,
    OptionalToRequired,
    TypeChanged,
    Extension,
}

/// One classified change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRecord {
    pub kind: ChangeKind,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_type: Option<DataType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_type: Option<DataType>,
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<String>,
}

impl ChangeRecord {
    /// A record scoped to a whole model
    pub fn model(
        kind: ChangeKind,
        model: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            model: model.into(),
            field: None,
            from_type: None,
            to_type: None,
            severity,
            message: message.into(),
            suggested_fix: None,
        }
    }

    /// A record scoped to one field of a model
    pub fn field(
        kind: ChangeKind,
        model: impl Into<String>,
        field: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field: Some(field.into()),
            ..Self::model(kind, model, severity, message)
        }
    }

    /// Builder: attach a type transition
    pub fn with_types(mut self, from: DataType, to: DataType) -> Self {
        self.from_type = Some(from);
        self.to_type = Some(to);
        self
    }

    /// Builder: attach the default remediation
    pub fn with_suggested_fix(mut self, fix: impl Into<String>) -> Self {
        self.suggested_fix = Some(fix.into());
        self
    }
}

/// Classified change buckets
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationIssues {
    pub safe_changes: Vec<ChangeRecord>,
    pub model_removals: Vec<ChangeRecord>,
    pub field_removals: Vec<ChangeRecord>,
    pub required_field_on_existing_model: Vec<ChangeRecord>,
    pub optional_to_required: Vec<ChangeRecord>,
    pub type_change_warnings: Vec<ChangeRecord>,
    pub destructive_type_changes: Vec<ChangeRecord>,
    pub extension_findings: Vec<ChangeRecord>,
}

impl MigrationIssues {
    /// All records across every bucket, in bucket order
    pub fn iter(&self) -> impl Iterator<Item = &ChangeRecord> {
        self.safe_changes
            .iter()
            .chain(&self.model_removals)
            .chain(&self.field_removals)
            .chain(&self.required_field_on_existing_model)
            .chain(&self.optional_to_required)
            .chain(&self.type_change_warnings)
            .chain(&self.destructive_type_changes)
            .chain(&self.extension_findings)
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }
}

/// Counts per severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub safe_count: usize,
    pub info_count: usize,
    pub fixable_count: usize,
    pub warning_count: usize,
    pub destructive_count: usize,
    pub danger_count: usize,
    pub total: usize,
}

impl ReportSummary {
    fn record(&mut self, severity: Severity) {
        match severity {
            Severity::Safe => self.safe_count += 1,
            Severity::Info => self.info_count += 1,
            Severity::Fixable => self.fixable_count += 1,
            Severity::Warning => self.warning_count += 1,
            Severity::Destructive => self.destructive_count += 1,
            Severity::Dangerous => self.danger_count += 1,
        }
        self.total += 1;
    }
}

/// Result of comparing current models against the stored manifest
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    pub is_first_generation: bool,
    pub has_issues: bool,
    pub has_dangerous_changes: bool,
    pub has_fixable_changes: bool,
    pub has_non_safe_issues: bool,
    pub issues: MigrationIssues,
    pub summary: ReportSummary,
}

impl MigrationReport {
    /// Report for a target that has no manifest yet
    pub fn first_generation() -> Self {
        Self {
            is_first_generation: true,
            ..Self::default()
        }
    }

    /// Build a report from classified buckets, deriving flags and counts
    pub fn from_issues(issues: MigrationIssues) -> Self {
        let mut summary = ReportSummary::default();
        for record in issues.iter() {
            summary.record(record.severity);
        }
        let has_non_safe_issues = issues.iter().any(|r| r.severity.is_non_safe());

        Self {
            is_first_generation: false,
            has_issues: !issues.is_empty(),
            has_dangerous_changes: summary.danger_count > 0,
            has_fixable_changes: summary.fixable_count > 0,
            has_non_safe_issues,
            issues,
            summary,
        }
    }

    /// Whether the caller should stop the deployment
    pub fn blocks_deployment(&self) -> bool {
        self.has_dangerous_changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_generation_report_is_empty() {
        let report = MigrationReport::first_generation();
        assert!(report.is_first_generation);
        assert!(!report.has_issues);
        assert!(report.issues.is_empty());
        assert_eq!(report.summary.total, 0);
    }

    #[test]
    fn test_info_only_report_is_not_non_safe() {
        let issues = MigrationIssues {
            field_removals: vec![ChangeRecord::field(
                ChangeKind::FieldRemoved,
                "Employee",
                "firstName",
                Severity::Info,
                "removed",
            )],
            ..Default::default()
        };
        let report = MigrationReport::from_issues(issues);
        assert!(report.has_issues);
        assert!(!report.has_non_safe_issues);
        assert!(!report.has_dangerous_changes);
        assert_eq!(report.summary.info_count, 1);
    }

    #[test]
    fn test_destructive_only_is_non_safe_but_not_dangerous() {
        let issues = MigrationIssues {
            safe_changes: vec![ChangeRecord::model(
                ChangeKind::ModelAdded,
                "Department",
                Severity::Safe,
                "new model",
            )],
            destructive_type_changes: vec![ChangeRecord::field(
                ChangeKind::TypeChanged,
                "Employee",
                "salary",
                Severity::Destructive,
                "Decimal -> String",
            )],
            ..Default::default()
        };
        let report = MigrationReport::from_issues(issues);
        assert!(report.has_non_safe_issues);
        assert!(!report.has_dangerous_changes);
        assert_eq!(report.issues.len(), 2);
        assert_eq!(report.summary.destructive_count, 1);
        assert_eq!(report.summary.safe_count, 1);
    }

    #[test]
    fn test_flags_follow_severities() {
        let issues = MigrationIssues {
            optional_to_required: vec![ChangeRecord::field(
                ChangeKind::OptionalToRequired,
                "Employee",
                "middleName",
                Severity::Dangerous,
                "now required",
            )],
            required_field_on_existing_model: vec![ChangeRecord::field(
                ChangeKind::RequiredFieldAdded,
                "Employee",
                "lastName",
                Severity::Fixable,
                "new required",
            )
            .with_suggested_fix(MADE_OPTIONAL)],
            ..Default::default()
        };
        let report = MigrationReport::from_issues(issues);
        assert!(report.has_dangerous_changes);
        assert!(report.has_fixable_changes);
        assert!(report.has_non_safe_issues);
        assert!(report.blocks_deployment());
        assert_eq!(report.summary.danger_count, 1);
        assert_eq!(report.summary.fixable_count, 1);
        assert_eq!(report.summary.total, 2);
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let issues = MigrationIssues {
            type_change_warnings: vec![ChangeRecord::field(
                ChangeKind::TypeChanged,
                "Employee",
                "salary",
                Severity::Warning,
                "lossy",
            )
            .with_types(DataType::Decimal, DataType::Float)],
            ..Default::default()
        };
        let json = serde_json::to_value(MigrationReport::from_issues(issues)).unwrap();
        assert_eq!(json["isFirstGeneration"], false);
        assert_eq!(json["summary"]["warningCount"], 1);
        let entry = &json["issues"]["typeChangeWarnings"][0];
        assert_eq!(entry["fromType"], "Decimal");
        assert_eq!(entry["toType"], "Float");
        assert_eq!(entry["severity"], "warning");
        assert!(entry.get("suggestedFix").is_none());
    }
}
