//! CLI output: per-item result lines and the machine-readable `report.json`.
//!
//! The display is information-first: each line leads with the item's
//! identity and outcome, with the output filename as the payload. The JSON
//! report carries the same entries for scripting against a batch run.

use crate::naming;
use crate::types::{ImageItem, Status};
use serde::Serialize;
use std::path::Path;

/// One item's outcome in a batch run.
#[derive(Debug, Serialize)]
pub struct ReportEntry {
    pub name: String,
    pub status: Status,
    /// Output filename, present for completed items.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Caption color actually used, when a caption was rendered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Summary of a whole batch run.
#[derive(Debug, Serialize)]
pub struct Report {
    pub completed: usize,
    pub failed: usize,
    pub entries: Vec<ReportEntry>,
}

/// Build the report from an ordered item snapshot.
pub fn build_report(items: &[ImageItem]) -> Report {
    let entries: Vec<ReportEntry> = items
        .iter()
        .map(|item| {
            let done = item.status == Status::Complete && item.download_bytes().is_some();
            ReportEntry {
                name: item.name.clone(),
                status: item.status,
                output: done.then(|| naming::download_name(&item.name, item.download_has_overlay())),
                color: (done && item.download_has_overlay()).then(|| item.settings.color.clone()),
                error: item.error.clone(),
            }
        })
        .collect();

    Report {
        completed: entries.iter().filter(|e| e.output.is_some()).count(),
        failed: entries
            .iter()
            .filter(|e| e.status == Status::Failed)
            .count(),
        entries,
    }
}

/// One display line per entry.
///
/// ```text
/// dawn.jpg → dawn_text_overlay.png (text #FFFFFF)
/// huge.jpg: failed — File size exceeds 5MB limit.
/// ```
pub fn format_entry(entry: &ReportEntry) -> String {
    match (&entry.output, &entry.error) {
        (Some(output), _) => match &entry.color {
            Some(color) => format!("{} → {} (text {})", entry.name, output, color),
            None => format!("{} → {}", entry.name, output),
        },
        (None, Some(error)) => format!("{}: failed — {}", entry.name, error),
        (None, None) => format!("{}: skipped", entry.name),
    }
}

/// Write the JSON report next to the batch outputs.
pub fn write_report(path: &Path, report: &Report) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)
}
