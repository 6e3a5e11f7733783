//! CSV export of recorded cycles.
//!
//! The file is written to a temp file beside the destination, synced, then
//! renamed over it, so readers never observe a half-written export.

use crate::types::sorted_by_start;
use crate::{CycleRecord, Error, Result};
use std::path::Path;
use tempfile::NamedTempFile;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow {
    start_date: String,
    end_date: String,
    period_days: i64,
    flow: &'static str,
    symptoms: String,
}

impl From<&CycleRecord> for CsvRow {
    fn from(record: &CycleRecord) -> Self {
        CsvRow {
            start_date: crate::interval::format_date(record.start_date),
            end_date: crate::interval::format_date(record.end_date),
            period_days: record.period_days(),
            flow: record.flow.as_str(),
            symptoms: record
                .symptoms
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(";"),
        }
    }
}

/// Write `cycles` to `path` as CSV, oldest first. Returns the row count.
pub fn export_csv(cycles: &[CycleRecord], path: &Path) -> Result<usize> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let temp = NamedTempFile::new_in(parent)?;
    let sorted = sorted_by_start(cycles);
    {
        let mut writer = csv::Writer::from_writer(temp.as_file());
        for record in &sorted {
            writer.serialize(CsvRow::from(*record))?;
        }
        writer.flush()?;
    }
    temp.as_file().sync_all()?;

    temp.persist(path).map_err(|e| Error::Io(e.error))?;

    tracing::info!("Exported {} cycles to {:?}", sorted.len(), path);
    Ok(sorted.len())
}
