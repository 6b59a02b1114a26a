//! CSV export of the normalized event log.

use crate::civil::CivilTime;
use crate::{CareEvent, Result};
use std::io::Write;
use std::path::Path;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow<'a> {
    id: &'a str,
    event_type: &'static str,
    timestamp_utc: String,
    local_date: String,
    local_time: String,
    auto_predicted: bool,
}

impl<'a> CsvRow<'a> {
    fn new(event: &'a CareEvent, zone: &impl CivilTime) -> Self {
        let civil = zone.to_civil(event.timestamp_utc);
        CsvRow {
            id: &event.id,
            event_type: event.event_type.as_str(),
            timestamp_utc: event.timestamp_utc.to_rfc3339(),
            local_date: civil.date.to_string(),
            local_time: format!("{:02}:{:02}", civil.hour, civil.minute),
            auto_predicted: event.auto_predicted,
        }
    }
}

/// Write events as CSV (with headers) to any writer
pub fn write_csv<W: Write>(events: &[CareEvent], zone: &impl CivilTime, out: W) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().has_headers(true).from_writer(out);
    for event in events {
        writer.serialize(CsvRow::new(event, zone))?;
    }
    writer.flush()?;
    Ok(())
}

/// Export events to a CSV file, replacing any previous export
///
/// Returns the number of rows written.
pub fn export_csv(events: &[CareEvent], zone: &impl CivilTime, csv_path: &Path) -> Result<usize> {
    if let Some(parent) = csv_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = std::fs::File::create(csv_path)?;
    write_csv(events, zone, &file)?;
    file.sync_all()?;

    tracing::info!("Exported {} events to {:?}", events.len(), csv_path);
    Ok(events.len())
}
