use crate::app::ports::{QueryResult, TableStore};
use crate::constants::OUTPUT_COLUMNS;
use crate::error::{EtlError, Result};
use crate::types::EnrichedBankRecord;
use std::fs;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Plain decimal rendering: never an exponent, whole numbers keep one decimal.
pub fn format_decimal(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// Writes the full record set to `path`, replacing any existing file.
#[instrument(skip_all, fields(records = records.len(), path = %path.display()))]
pub fn write_csv(records: &[EnrichedBankRecord], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| io_error(path, e))?;
        }
    }

    let mut writer = csv::Writer::from_path(path).map_err(|e| io_error(path, e))?;
    writer
        .write_record(OUTPUT_COLUMNS)
        .map_err(|e| io_error(path, e))?;
    for record in records {
        let mut row = Vec::with_capacity(OUTPUT_COLUMNS.len());
        row.push(record.name.clone());
        row.extend(record.amounts().iter().map(|v| format_decimal(*v)));
        writer.write_record(&row).map_err(|e| io_error(path, e))?;
    }
    writer.flush().map_err(|e| io_error(path, e))?;

    info!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}

/// Reads back a file produced by [`write_csv`].
pub fn read_csv(path: &Path) -> Result<Vec<EnrichedBankRecord>> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| io_error(path, e))?;
    let mut records = Vec::new();
    for row in reader.deserialize() {
        let record: EnrichedBankRecord = row.map_err(|e| io_error(path, e))?;
        records.push(record);
    }
    debug!("Read {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Replaces the contents of `table` with `records`.
pub fn write_table(
    records: &[EnrichedBankRecord],
    store: &mut dyn TableStore,
    table: &str,
) -> Result<()> {
    store.replace_table(table, records)?;
    info!("Loaded {} records into table {}", records.len(), table);
    Ok(())
}

/// Runs a caller-supplied read query; the text is passed to the store as is.
pub fn run_query(query: &str, store: &dyn TableStore) -> Result<QueryResult> {
    debug!("Running query: {}", query);
    store.query(query)
}

fn io_error(path: &Path, err: impl std::fmt::Display) -> EtlError {
    EtlError::Io(format!("{}: {}", path.display(), err))
}
