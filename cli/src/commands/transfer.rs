use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Local;

use chartbook_core::csv_codec::export_file_name;
use chartbook_core::service::ChartbookService;

pub(crate) fn cmd_export(service: &ChartbookService, out: Option<PathBuf>, json: bool) -> Result<()> {
    let path = out.unwrap_or_else(|| PathBuf::from(export_file_name(Local::now().date_naive())));
    let rows = service.export_csv_file(&path)?;

    if json {
        println!(
            "{}",
            serde_json::json!({ "path": path.display().to_string(), "rows": rows })
        );
    } else {
        println!("Exported {rows} measurements to {}", path.display());
    }
    Ok(())
}

pub(crate) fn cmd_import(service: &ChartbookService, path: &Path, json: bool) -> Result<()> {
    let report = service.import_csv_file(path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Import complete.\n");
    println!("  Imported: {}", report.success_count);
    println!("  Errors:   {}", report.error_count);
    if !report.messages.is_empty() {
        println!();
        for message in &report.messages {
            println!("  {message}");
        }
    }
    Ok(())
}
