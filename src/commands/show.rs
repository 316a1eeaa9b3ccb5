//! `show` - print the stored manifest

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;

use super::RunContext;
use crate::ui;

pub async fn execute(ctx: &RunContext, target: PathBuf, json: bool) -> Result<()> {
    let config = ctx.load_config(&target)?;
    let store = ctx.store(&config);

    let manifest = store
        .load_manifest(&target)
        .await
        .with_context(|| format!("Failed to load manifest for {}", target.display()))?;

    let Some(manifest) = manifest else {
        ui::print_info(&format!(
            "No manifest at {}",
            config.manifest.manifest_path(&target).display()
        ));
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&manifest)?);
        return Ok(());
    }

    ui::print_header(&format!("Manifest: {}", manifest.microservice_name));
    println!("   {} {}", "Revision:".bold(), manifest.revision);
    println!("   {} {}", "Models:".bold(), manifest.models.len());
    for (name, snapshot) in &manifest.models {
        println!(
            "     {:<30} {} fields  {}",
            name,
            snapshot.fields.len(),
            snapshot.checksum.get(..12).unwrap_or(snapshot.checksum.as_str()).dimmed()
        );
    }
    println!(
        "   {} {}",
        "Fixes applied:".bold(),
        manifest.auto_fixes_applied.len()
    );
    for fix in &manifest.auto_fixes_applied {
        println!("     {}.{}: {}", fix.model, fix.field, fix.fix);
    }
    Ok(())
}
