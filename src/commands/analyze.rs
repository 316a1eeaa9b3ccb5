//! `analyze` - classify pending schema changes for a target
//!
//! Fails closed: dangerous changes make the command exit non-zero unless
//! `--allow-dangerous` is passed.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use std::path::PathBuf;

use migration_guard::{AnalysisRequest, MigrationAnalyzer, MigrationReport};

use super::{read_models, RunContext};
use crate::ui;

pub async fn execute(
    ctx: &RunContext,
    target: PathBuf,
    microservice: String,
    models: PathBuf,
    json: bool,
    allow_dangerous: bool,
) -> Result<()> {
    let config = ctx.load_config(&target)?;
    let definitions = read_models(&models).await?;
    let store = ctx.store(&config);

    let request = AnalysisRequest::new(microservice, definitions, &target);
    let report = MigrationAnalyzer::from_config(&store, &config.analysis)
        .analyze_migration_issues(&request)
        .await
        .with_context(|| format!("Migration analysis failed for {}", target.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&target, &report);
    }

    if report.blocks_deployment() {
        if allow_dangerous {
            ui::print_warning("Dangerous changes allowed by --allow-dangerous");
        } else {
            bail!(
                "{} dangerous change(s) found for {}.\n  \
                 Review the report, or pass --allow-dangerous to proceed anyway.",
                report.summary.danger_count,
                target.display()
            );
        }
    }

    Ok(())
}

fn print_report(target: &std::path::Path, report: &MigrationReport) {
    ui::print_header(&format!("Migration analysis: {}", target.display()));

    if report.is_first_generation {
        ui::print_info("No manifest yet; first generation for this target");
        return;
    }
    if !report.has_issues {
        ui::print_success("No schema changes since the last recorded generation");
        return;
    }

    let sections = [
        ("Dangerous", &report.issues.optional_to_required),
        ("Destructive type changes", &report.issues.destructive_type_changes),
        ("Type change warnings", &report.issues.type_change_warnings),
        ("New required fields", &report.issues.required_field_on_existing_model),
        ("Extension findings", &report.issues.extension_findings),
        ("Removed fields", &report.issues.field_removals),
        ("Removed models", &report.issues.model_removals),
        ("New models", &report.issues.safe_changes),
    ];
    for (title, records) in sections {
        if records.is_empty() {
            continue;
        }
        println!("{}", title.bold());
        for record in records.iter() {
            ui::print_record(record);
        }
        println!();
    }

    let s = &report.summary;
    println!(
        "{} {} total: {} safe, {} info, {} fixable, {} warning, {} destructive, {} dangerous",
        "Summary:".bold(),
        s.total,
        s.safe_count,
        s.info_count,
        s.fixable_count,
        s.warning_count,
        s.destructive_count,
        s.danger_count
    );

    if report.has_dangerous_changes {
        ui::print_error("Dangerous changes found");
    } else if report.has_non_safe_issues {
        ui::print_warning("Changes need review before deployment");
    } else {
        ui::print_success("All changes are safe");
    }
}
