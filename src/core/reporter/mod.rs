//! # Reporter Module
//!
//! Summarizes the frozen index: how many photos survived deduplication,
//! how much they weigh, and how they spread across groups.
//!
//! Runs strictly after collection, on the read-only index.

use crate::core::index::FrozenIndex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;

/// Size and count of one group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub group: String,
    pub count: usize,
    pub size_bytes: u64,
}

/// Totals over the whole index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Retained photos
    pub total_files: usize,
    /// Sum of their sizes
    pub total_bytes: u64,
    /// Per-group breakdown, in key order
    pub by_group: Vec<GroupSummary>,
}

impl ReportSummary {
    pub fn from_index(index: &FrozenIndex) -> Self {
        let by_group: Vec<GroupSummary> = index
            .groups()
            .map(|(key, records)| GroupSummary {
                group: key.to_string(),
                count: records.len(),
                size_bytes: records.iter().map(|r| r.size_bytes).sum(),
            })
            .collect();

        Self {
            total_files: by_group.iter().map(|g| g.count).sum(),
            total_bytes: by_group.iter().map(|g| g.size_bytes).sum(),
            by_group,
        }
    }

    /// Total size in decimal megabytes
    pub fn total_megabytes(&self) -> f64 {
        self.total_bytes as f64 / 1_000_000.0
    }

    pub fn group_count(&self) -> usize {
        self.by_group.len()
    }
}

impl fmt::Display for ReportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "total image count is {}", self.total_files)?;
        write!(f, "total image size is {:.2} Mb", self.total_megabytes())
    }
}

/// Write every retained photo as CSV.
///
/// Columns: Group, Source Path, Size (bytes), Fingerprint
pub fn export_csv<W: Write>(index: &FrozenIndex, mut writer: W) -> std::io::Result<()> {
    writeln!(writer, "Group,Source Path,Size (bytes),Fingerprint")?;

    for (key, records) in index.groups() {
        for record in records {
            writeln!(
                writer,
                "{},{},{},{}",
                escape_csv(&key.to_string()),
                escape_csv(&record.path.display().to_string()),
                record.size_bytes,
                record.fingerprint
            )?;
        }
    }

    Ok(())
}

fn escape_csv(field: &str) -> String {
    if field.contains(|c: char| matches!(c, ',' | '"' | '\n')) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
