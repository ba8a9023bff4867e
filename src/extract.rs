//! CSV domain extraction
//!
//! Pulls candidate hostnames out of an uploaded CSV. The column holding the
//! domains is detected from the first row only:
//!
//! 1. The first cell that contains a dot, no whitespace and no `@`, and is not
//!    literally `domain`/`website`/`url`, wins. This catches files whose first
//!    row is already data.
//! 2. Otherwise the first cell exactly matching `domain`/`website`/`url`
//!    (case-insensitive) marks a real header row.
//! 3. Otherwise column index 2 is assumed.
//!
//! A data-looking first row is kept in the extracted list; a header row is
//! skipped. Values are normalized to bare hostnames (scheme and trailing
//! slash stripped).

use anyhow::{Context, Result};
use std::io::Read;

/// Header literals recognized during column detection
const HEADER_NAMES: [&str; 3] = ["domain", "website", "url"];

/// Fallback column index when detection finds nothing usable
const DEFAULT_DOMAIN_COLUMN: usize = 2;

/// Result of extracting domains from a CSV stream
#[derive(Debug, Clone, PartialEq)]
pub struct DomainList {
    /// Normalized hostnames in CSV order
    pub domains: Vec<String>,
    /// Zero-based index of the column the domains came from
    pub column: usize,
}

impl DomainList {
    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

/// Extract an ordered list of normalized hostnames from CSV content.
///
/// Fails on malformed CSV; no partial list is returned in that case.
pub fn extract_domains<R: Read>(reader: R) -> Result<DomainList> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut domains = Vec::new();
    let mut column: Option<usize> = None;

    for (row_index, record) in csv_reader.records().enumerate() {
        let record = record.context("Failed to parse CSV record")?;

        // Blank lines come through as a single empty field
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        if row_index == 0 {
            let col = detect_domain_column(&record);
            column = Some(col);

            // A real header row is skipped; a data-looking first row is kept
            let first_cell = record.get(col).unwrap_or("").trim().to_lowercase();
            if HEADER_NAMES.contains(&first_cell.as_str()) {
                continue;
            }
        }

        let col = column.unwrap_or(DEFAULT_DOMAIN_COLUMN);
        let Some(cell) = record.get(col) else {
            continue;
        };
        if cell.is_empty() || cell.eq_ignore_ascii_case("domain") {
            continue;
        }
        let domain = normalize_domain(cell);
        if !domain.is_empty() {
            domains.push(domain);
        }
    }

    Ok(DomainList {
        domains,
        column: column.unwrap_or(DEFAULT_DOMAIN_COLUMN),
    })
}

/// Pick the domain column by inspecting the first row.
fn detect_domain_column(record: &csv::StringRecord) -> usize {
    // Pass 1: a cell that already looks like a domain
    for (i, cell) in record.iter().enumerate() {
        let cell = cell.to_lowercase();
        if cell.contains('.')
            && !cell.chars().any(char::is_whitespace)
            && !cell.contains('@')
            && !HEADER_NAMES.contains(&cell.as_str())
        {
            return i;
        }
    }

    // Pass 2: a recognizable header name
    for (i, cell) in record.iter().enumerate() {
        let cell = cell.to_lowercase();
        if HEADER_NAMES.contains(&cell.as_str()) {
            return i;
        }
    }

    DEFAULT_DOMAIN_COLUMN
}

/// Strip scheme prefix and trailing slash, returning a bare hostname.
pub fn normalize_domain(raw: &str) -> String {
    let mut domain = raw.trim();
    if let Some(rest) = domain.strip_prefix("https://") {
        domain = rest;
    } else if let Some(rest) = domain.strip_prefix("http://") {
        domain = rest;
    }
    domain.trim_end_matches('/').trim().to_string()
}
