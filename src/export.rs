//! Report writing
//!
//! Matched domains are written out as CSV (the default, one row per finding
//! with the evidence trail joined into a single column) or as pretty-printed
//! JSON with a small summary header.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::path::Path;
use tracing::info;

use crate::job::{DomainRecord, JobProgress};

/// JSON report envelope
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonReport<'a> {
    generated_at: chrono::DateTime<Utc>,
    total_checked: usize,
    match_count: usize,
    matches: &'a [DomainRecord],
}

/// Write findings as CSV with one row per matched domain.
pub fn export_csv(path: &Path, records: &[DomainRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    writer.write_record(["Domain", "Company Name", "Evidence"])?;
    for record in records {
        writer.write_record([
            record.domain.as_str(),
            record.company_name.as_deref().unwrap_or("N/A"),
            &record.evidence.join("; "),
        ])?;
    }
    writer.flush()?;

    info!("Wrote {} findings to {}", records.len(), path.display());
    Ok(())
}

/// Write findings as pretty-printed JSON with a summary envelope.
pub fn export_json(path: &Path, progress: &JobProgress) -> Result<()> {
    let report = JsonReport {
        generated_at: Utc::now(),
        total_checked: progress.checked,
        match_count: progress.success_count,
        matches: &progress.successful_domains_with_evidence,
    };
    let json = serde_json::to_string_pretty(&report)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    info!(
        "Wrote {} findings to {}",
        progress.success_count,
        path.display()
    );
    Ok(())
}

/// Print a human-readable run summary to stdout.
pub fn print_summary(progress: &JobProgress) {
    println!();
    println!("Scan summary");
    println!("  Domains checked: {}/{}", progress.checked, progress.total);
    println!("  Umbraco matches: {}", progress.success_count);
    if let Some(error) = &progress.error {
        println!("  Error: {}", error);
    }
    for record in &progress.successful_domains_with_evidence {
        println!(
            "  - {} ({})",
            record.domain,
            record.company_name.as_deref().unwrap_or("N/A")
        );
    }
}
