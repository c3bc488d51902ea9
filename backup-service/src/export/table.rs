//! Per-table CSV export.
//!
//! File layout: comment header lines, one blank line, the column-header
//! row, then one row per record in server order.

use super::header::{backup_time_now, ArtifactHeader};
use crate::db::TableSnapshot;
use crate::labels::ContainerLabels;
use crate::Result;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write one table export. Returns the number of data rows written.
pub fn write_table_file(
    path: &Path,
    database: &str,
    table: &str,
    snapshot: &TableSnapshot,
    labels: &ContainerLabels,
) -> Result<usize> {
    let header = ArtifactHeader {
        database,
        table: Some(table),
        backup_time: backup_time_now(),
        record_count: Some(snapshot.rows.len()),
        format: "CSV",
        generated_by: None,
        labels,
    };

    let mut out = BufWriter::new(File::create(path)?);
    for line in header.lines("#") {
        writeln!(out, "{}", line)?;
    }
    writeln!(out)?;

    let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(out);
    writer.write_record(&snapshot.columns)?;
    for row in &snapshot.rows {
        writer.write_record(row)?;
    }
    writer.flush()?;

    Ok(snapshot.rows.len())
}
