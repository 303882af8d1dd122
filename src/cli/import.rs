use std::path::Path;

use colored::Colorize;

use crate::db::get_connection;
use crate::error::{Result, TesoroError};
use crate::fmt::money;
use crate::importer::{import_workbook, ImportMode};
use crate::models::ImportSummary;
use crate::settings::get_data_dir;

pub fn run(file: &str, account: &str, dry_run: bool, json: bool) -> Result<()> {
    let path = Path::new(file);
    let bytes = std::fs::read(path)?;
    let source_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(file)
        .to_string();

    let mut conn = get_connection(&get_data_dir().join("tesoro.db"))?;
    let mode = if dry_run { ImportMode::DryRun } else { ImportMode::Apply };
    let summary = import_workbook(&mut conn, &bytes, &source_name, account, mode)?;

    if json {
        let rendered = serde_json::to_string_pretty(&summary)
            .map_err(|e| TesoroError::Other(e.to_string()))?;
        println!("{rendered}");
        return Ok(());
    }

    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &ImportSummary) {
    println!("{}", summary.message);
    println!();
    for (sheet, s) in &summary.per_sheet {
        println!(
            "  {sheet} [{}]: {} movement(s), {} -> {}",
            s.period,
            s.movement_count,
            money(s.starting_balance),
            money(s.calculated_ending_balance),
        );
    }
    if !summary.per_sheet.is_empty() {
        println!("  Final balance: {}", money(summary.final_calculated_balance));
    }

    if !summary.warnings.is_empty() {
        println!();
        for warning in &summary.warnings {
            println!("{} {warning}", "warning:".yellow());
        }
    }
    if !summary.errors.is_empty() {
        println!();
        for error in &summary.errors {
            println!("{} {error}", "error:".red());
        }
    }
}
