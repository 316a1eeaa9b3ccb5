//! Snapshot diffing and change classification
//!
//! Pure comparison of the stored manifest against freshly built snapshots.
//! Models are walked in name order and fields in name order, so the same
//! inputs always produce the same records in the same order.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::compatibility::{TypeChangeSeverity, TypeCompatibilityMatrix};
use super::manifest::Manifest;
use super::report::{ChangeKind, ChangeRecord, MigrationIssues, Severity, MADE_OPTIONAL};
use super::snapshot::{FieldSnapshot, ModelSnapshot};

/// Configurable severity decisions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityPolicy {
    /// Treat destructive type changes as blocking instead of review-only
    #[serde(default)]
    pub destructive_type_changes_block: bool,
}

/// Classify every change between `prior` and `current`
pub fn diff_manifest(
    prior: &Manifest,
    current: &BTreeMap<String, ModelSnapshot>,
    matrix: &TypeCompatibilityMatrix,
    policy: SeverityPolicy,
) -> MigrationIssues {
    let mut issues = MigrationIssues::default();

    for name in prior.models.keys() {
        if !current.contains_key(name) {
            issues.model_removals.push(ChangeRecord::model(
                ChangeKind::ModelRemoved,
                name,
                Severity::Info,
                format!("Model {} is no longer defined; its table is left in place", name),
            ));
        }
    }

    for (name, snapshot) in current {
        match prior.models.get(name) {
            None => issues.safe_changes.push(ChangeRecord::model(
                ChangeKind::ModelAdded,
                name,
                Severity::Safe,
                format!("New model {}", name),
            )),
            Some(previous) if previous.checksum == snapshot.checksum => {
                debug!(model = %name, "Checksum unchanged, skipping field diff");
            }
            Some(previous) => diff_fields(name, previous, snapshot, matrix, policy, &mut issues),
        }
    }

    issues
}

fn diff_fields(
    model: &str,
    previous: &ModelSnapshot,
    current: &ModelSnapshot,
    matrix: &TypeCompatibilityMatrix,
    policy: SeverityPolicy,
    issues: &mut MigrationIssues,
) {
    let before = previous.field_map();
    let after = current.field_map();
    let names: BTreeSet<&str> = before.keys().chain(after.keys()).copied().collect();

    for name in names {
        match (before.get(name), after.get(name)) {
            (Some(_), None) => issues.field_removals.push(ChangeRecord::field(
                ChangeKind::FieldRemoved,
                model,
                name,
                Severity::Info,
                format!("Field {}.{} was removed; existing data is kept", model, name),
            )),
            (None, Some(added)) if !added.is_optional => {
                issues.required_field_on_existing_model.push(
                    ChangeRecord::field(
                        ChangeKind::RequiredFieldAdded,
                        model,
                        name,
                        Severity::Fixable,
                        format!(
                            "Required field {}.{} added to an existing model; existing rows have no value",
                            model, name
                        ),
                    )
                    .with_suggested_fix(MADE_OPTIONAL),
                )
            }
            (Some(old), Some(new)) => diff_field(model, old, new, matrix, policy, issues),
            _ => {}
        }
    }
}

fn diff_field(
    model: &str,
    old: &FieldSnapshot,
    new: &FieldSnapshot,
    matrix: &TypeCompatibilityMatrix,
    policy: SeverityPolicy,
    issues: &mut MigrationIssues,
) {
    if old.is_optional && !new.is_optional {
        issues.optional_to_required.push(ChangeRecord::field(
            ChangeKind::OptionalToRequired,
            model,
            &new.name,
            Severity::Dangerous,
            format!(
                "Field {}.{} changed from optional to required; existing null values would violate the constraint",
                model, new.name
            ),
        ));
    }

    if old.data_type == new.data_type {
        return;
    }

    let record = |severity: Severity, note: &str| {
        ChangeRecord::field(
            ChangeKind::TypeChanged,
            model,
            &new.name,
            severity,
            format!(
                "Field {}.{} changed type {} -> {}: {}",
                model, new.name, old.data_type, new.data_type, note
            ),
        )
        .with_types(old.data_type.clone(), new.data_type.clone())
    };

    match matrix.classify(&old.data_type, &new.data_type) {
        TypeChangeSeverity::Safe => {
            debug!(
                model = %model,
                field = %new.name,
                from = %old.data_type,
                to = %new.data_type,
                "Safe type widening"
            );
        }
        TypeChangeSeverity::Warning => issues
            .type_change_warnings
            .push(record(Severity::Warning, "conversion may lose precision")),
        TypeChangeSeverity::Destructive => {
            let severity = if policy.destructive_type_changes_block {
                Severity::Dangerous
            } else {
                Severity::Destructive
            };
            issues.destructive_type_changes.push(record(
                severity,
                "existing data is unlikely to convert; review before deploying",
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::report::MigrationReport;
    use crate::domain::snapshot::DataType;

    fn model(fields: &[(&str, DataType, bool)]) -> ModelSnapshot {
        ModelSnapshot::from_fields(
            fields
                .iter()
                .map(|(n, t, o)| FieldSnapshot::new(*n, t.clone(), *o))
                .collect(),
        )
    }

    fn employee_v1() -> ModelSnapshot {
        model(&[
            ("id", DataType::Int, false),
            ("firstName", DataType::String, false),
            ("middleName", DataType::String, true),
            ("salary", DataType::Decimal, false),
        ])
    }

    fn prior() -> Manifest {
        let mut manifest = Manifest::new("hr");
        let mut models = BTreeMap::new();
        models.insert("Employee".to_string(), employee_v1());
        manifest.merge(models, vec![]);
        manifest
    }

    fn run(current: BTreeMap<String, ModelSnapshot>, policy: SeverityPolicy) -> MigrationReport {
        MigrationReport::from_issues(diff_manifest(
            &prior(),
            &current,
            &TypeCompatibilityMatrix::new(),
            policy,
        ))
    }

    fn single(name: &str, snapshot: ModelSnapshot) -> BTreeMap<String, ModelSnapshot> {
        let mut map = BTreeMap::new();
        map.insert(name.to_string(), snapshot);
        map
    }

    #[test]
    fn test_unchanged_model_produces_nothing() {
        let report = run(single("Employee", employee_v1()), SeverityPolicy::default());
        assert!(!report.has_issues);
        assert_eq!(report.summary.total, 0);
    }

    #[test]
    fn test_optional_field_added_is_silent() {
        let current = model(&[
            ("id", DataType::Int, false),
            ("firstName", DataType::String, false),
            ("middleName", DataType::String, true),
            ("salary", DataType::Decimal, false),
            ("nickname", DataType::String, true),
        ]);
        let report = run(single("Employee", current), SeverityPolicy::default());
        assert!(!report.has_issues);
    }

    #[test]
    fn test_required_to_optional_is_silent() {
        let current = model(&[
            ("id", DataType::Int, false),
            ("firstName", DataType::String, true),
            ("middleName", DataType::String, true),
            ("salary", DataType::Decimal, false),
        ]);
        let report = run(single("Employee", current), SeverityPolicy::default());
        assert!(!report.has_issues);
    }

    #[test]
    fn test_safe_widening_is_not_reported() {
        let current = model(&[
            ("id", DataType::BigInt, false),
            ("firstName", DataType::String, false),
            ("middleName", DataType::String, true),
            ("salary", DataType::Decimal, false),
        ]);
        let report = run(single("Employee", current), SeverityPolicy::default());
        assert!(!report.has_issues);
    }

    #[test]
    fn test_retype_and_tighten_yields_two_records() {
        let current = model(&[
            ("id", DataType::Int, false),
            ("firstName", DataType::String, false),
            ("middleName", DataType::Json, false),
            ("salary", DataType::Decimal, false),
        ]);
        let report = run(single("Employee", current), SeverityPolicy::default());
        assert_eq!(report.issues.optional_to_required.len(), 1);
        assert_eq!(report.issues.destructive_type_changes.len(), 1);
        assert!(report.has_dangerous_changes);
    }

    #[test]
    fn test_destructive_does_not_block_by_default() {
        let current = model(&[
            ("id", DataType::Int, false),
            ("firstName", DataType::String, false),
            ("middleName", DataType::String, true),
            ("salary", DataType::String, false),
        ]);
        let report = run(single("Employee", current.clone()), SeverityPolicy::default());
        assert!(!report.has_dangerous_changes);
        assert!(report.has_non_safe_issues);
        assert_eq!(report.summary.destructive_count, 1);

        let strict = SeverityPolicy {
            destructive_type_changes_block: true,
        };
        let report = run(single("Employee", current), strict);
        assert!(report.has_dangerous_changes);
        assert_eq!(report.issues.destructive_type_changes.len(), 1);
        assert_eq!(report.summary.danger_count, 1);
    }

    #[test]
    fn test_records_are_ordered_by_name() {
        let current = model(&[("id", DataType::Int, false)]);
        let report = run(single("Employee", current), SeverityPolicy::default());
        let removed: Vec<_> = report
            .issues
            .field_removals
            .iter()
            .filter_map(|r| r.field.as_deref())
            .collect();
        assert_eq!(removed, vec!["firstName", "middleName", "salary"]);
    }
}
