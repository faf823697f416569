//! Import audit log: one `import_logs` entry per finished table

use crate::result::{ImportResult, TableStatus};
use crate::store::{CatalogStore, ImportLogEntry};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

pub const OPERATION_IMPORT: &str = "import";

/// Audit entry for a table, or `None` when the table never finished
pub fn entry_for(result: &ImportResult, run_started_at: DateTime<Utc>) -> Option<ImportLogEntry> {
    let notes = match result.status {
        TableStatus::Aborted | TableStatus::NotRun => return None,
        TableStatus::SourceAbsent | TableStatus::SourceUnreadable => result.note.clone(),
        TableStatus::Completed => Some(counter_notes(result)),
    };

    Some(ImportLogEntry {
        table_name: result.table.clone(),
        operation: OPERATION_IMPORT.to_string(),
        records_affected: i64::try_from(result.succeeded()).unwrap_or(i64::MAX),
        import_started_at: run_started_at,
        notes,
    })
}

fn counter_notes(result: &ImportResult) -> String {
    let c = &result.counts;
    let mut notes = format!(
        "inserted={} updated={} unchanged={} parse_failed={} transform_failed={} write_failed={}",
        c.inserted, c.updated, c.unchanged, c.parse_failed, c.transform_failed, c.write_failed
    );
    if let Some(read_error) = &result.read_error {
        notes.push_str(&format!("; read aborted: {}", read_error));
    }
    notes
}

/// Persist the entry for a finished table; failures are logged, never raised
pub async fn record<S: CatalogStore + ?Sized>(
    store: &S,
    result: &ImportResult,
    run_started_at: DateTime<Utc>,
) {
    let Some(entry) = entry_for(result, run_started_at) else {
        return;
    };

    match store.record_import(&entry).await {
        Ok(()) => debug!(table = %entry.table_name, "Import logged"),
        Err(e) => warn!(table = %entry.table_name, error = %e, "Failed to write import log entry"),
    }
}
