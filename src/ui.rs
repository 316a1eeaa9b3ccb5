// Terminal UI utilities

use colored::Colorize;

use migration_guard::{ChangeRecord, Severity};

pub fn print_header(title: &str) {
    println!();
    println!(
        "{}",
        "╔════════════════════════════════════════════════════════════╗".bright_blue()
    );
    println!("{}", format!("║  {:<58}║", title).bright_blue());
    println!(
        "{}",
        "╚════════════════════════════════════════════════════════════╝".bright_blue()
    );
    println!();
}

pub fn print_success(message: &str) {
    println!("{}", format!("✅ {}", message).bright_green().bold());
}

pub fn print_error(message: &str) {
    eprintln!("{}", format!("❌ {}", message).bright_red().bold());
}

pub fn print_info(message: &str) {
    println!("{}", format!("ℹ️  {}", message).bright_cyan());
}

pub fn print_warning(message: &str) {
    println!("{}", format!("⚠️  {}", message).bright_yellow());
}

/// Colored severity tag padded for column alignment
pub fn severity_label(severity: Severity) -> String {
    let label = format!("{:<11}", severity.name().to_uppercase());
    match severity {
        Severity::Safe => label.green().to_string(),
        Severity::Info => label.cyan().to_string(),
        Severity::Fixable => label.bright_yellow().to_string(),
        Severity::Warning => label.yellow().to_string(),
        Severity::Destructive => label.bright_red().to_string(),
        Severity::Dangerous => label.red().bold().to_string(),
    }
}

pub fn print_record(record: &ChangeRecord) {
    println!("   {} {}", severity_label(record.severity), record.message);
    if let Some(fix) = &record.suggested_fix {
        println!("   {:<11} suggested fix: {}", "", fix.dimmed());
    }
}
