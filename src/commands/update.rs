//! `update` - record the current models as the target's new baseline
//!
//! With `--auto-fix` the fixed definitions are written back (to
//! `--write-models`, or over `--models`) before the manifest is updated, so
//! the next `analyze` of the same file matches the recorded baseline.

use anyhow::{Context, Result};
use std::path::PathBuf;

use migration_guard::{
    plan_default_fixes, AnalysisRequest, AppliedFix, ManifestUpdate, MigrationAnalyzer,
};

use super::{read_document, read_models, write_document, RunContext};
use crate::ui;

pub async fn execute(
    ctx: &RunContext,
    target: PathBuf,
    microservice: String,
    models: PathBuf,
    fixes: Option<PathBuf>,
    auto_fix: bool,
    write_models: Option<PathBuf>,
) -> Result<()> {
    let config = ctx.load_config(&target)?;
    let mut definitions = read_models(&models).await?;
    let mut applied_fixes: Vec<AppliedFix> = match &fixes {
        Some(path) => read_document(path).await?,
        None => Vec::new(),
    };
    let store = ctx.store(&config);

    if auto_fix {
        let request = AnalysisRequest::new(&microservice, definitions.clone(), &target);
        let report = MigrationAnalyzer::from_config(&store, &config.analysis)
            .analyze_migration_issues(&request)
            .await
            .with_context(|| format!("Migration analysis failed for {}", target.display()))?;

        let plan = plan_default_fixes(&report, &definitions);
        for fix in &plan.applied_fixes {
            ui::print_info(&format!("{}.{}: {}", fix.model, fix.field, fix.fix));
        }
        if report.has_dangerous_changes {
            ui::print_warning("Dangerous changes cannot be fixed automatically");
        }

        if !plan.is_empty() {
            let destination = write_models.as_ref().unwrap_or(&models);
            write_document(destination, &plan.models).await?;
            ui::print_info(&format!(
                "Fixed model definitions written to {}",
                destination.display()
            ));
        }
        definitions = plan.models;
        applied_fixes.extend(plan.applied_fixes);
    }

    let fix_count = applied_fixes.len();
    let update = ManifestUpdate::new(&target, microservice, definitions)
        .with_applied_fixes(applied_fixes);
    let manifest = store
        .update_manifest(update)
        .await
        .with_context(|| format!("Failed to update manifest for {}", target.display()))?;

    ui::print_success(&format!(
        "Manifest revision {} recorded ({} models, {} fixes appended)",
        manifest.revision,
        manifest.models.len(),
        fix_count
    ));
    Ok(())
}
