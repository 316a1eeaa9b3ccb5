//! Default remediation for fixable changes
//!
//! The only automatic repair is relaxing a newly added required field on an
//! existing model to optional. Warnings, destructive type changes and
//! dangerous changes always go back to a human.

use tracing::debug;

use crate::domain::{AppliedFix, MigrationReport, ModelDefinition, MADE_OPTIONAL};

/// Rewritten model definitions plus the fixes to record in the manifest
#[derive(Debug, Clone, PartialEq)]
pub struct FixPlan {
    pub models: Vec<ModelDefinition>,
    pub applied_fixes: Vec<AppliedFix>,
}

impl FixPlan {
    pub fn is_empty(&self) -> bool {
        self.applied_fixes.is_empty()
    }
}

/// Apply the default fix to every fixable record in `report`
pub fn plan_default_fixes(report: &MigrationReport, models: &[ModelDefinition]) -> FixPlan {
    let mut models = models.to_vec();
    let mut applied_fixes = Vec::new();

    for record in &report.issues.required_field_on_existing_model {
        let Some(field_name) = record.field.as_deref() else {
            continue;
        };
        let field = models
            .iter_mut()
            .filter(|m| m.name == record.model)
            .flat_map(|m| m.fields.iter_mut())
            .find(|f| f.name == field_name);

        match field {
            Some(field) if !field.is_optional => {
                field.is_optional = true;
                applied_fixes.push(AppliedFix::new(&record.model, field_name, MADE_OPTIONAL));
                debug!(model = %record.model, field = %field_name, "Relaxed field to optional");
            }
            Some(_) => {}
            None => debug!(
                model = %record.model,
                field = %field_name,
                "Fixable field not present in definitions, skipping"
            ),
        }
    }

    FixPlan {
        models,
        applied_fixes,
    }
}
