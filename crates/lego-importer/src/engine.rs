//! Batch upsert engine
//!
//! Pulls records from a source stream, transforms them, and writes them to the
//! store in bounded batches. Parse and transform failures are counted and
//! never reach a batch; at most one batch of rows is held in memory.

use crate::error::{ImportError, ParseError};
use crate::registry::{TableImportSpec, TransformedRow};
use crate::result::ImportResult;
use crate::source::RawRecord;
use crate::store::{CatalogStore, RowOutcome};
use tracing::{debug, error, warn};

/// Rows awaiting one round of writes
#[derive(Debug, Clone, Default)]
pub struct ImportBatch {
    rows: Vec<TransformedRow>,
}

impl ImportBatch {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rows: Vec::with_capacity(capacity),
        }
    }

    pub fn from_rows(rows: Vec<TransformedRow>) -> Self {
        Self { rows }
    }

    pub fn push(&mut self, row: TransformedRow) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[TransformedRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }
}

pub struct BatchUpsertEngine<'a, S: CatalogStore + ?Sized> {
    store: &'a S,
    batch_size: usize,
}

impl<'a, S: CatalogStore + ?Sized> BatchUpsertEngine<'a, S> {
    pub fn new(store: &'a S, batch_size: usize) -> Self {
        Self {
            store,
            batch_size: batch_size.max(1),
        }
    }

    /// Import every record of one table, accumulating counters into `result`
    ///
    /// Returns `Err` only for a connectivity failure; counters reflect all
    /// batches flushed before it.
    pub async fn run<I>(
        &self,
        spec: &TableImportSpec,
        records: I,
        result: &mut ImportResult,
    ) -> Result<(), ImportError>
    where
        I: Iterator<Item = Result<RawRecord, ParseError>>,
    {
        let mut batch = ImportBatch::with_capacity(self.batch_size);

        for item in records {
            let record = match item {
                Ok(record) => record,
                Err(ParseError::Read { message }) => {
                    warn!(table = spec.table, error = %message, "Source stream ended early");
                    result.read_error = Some(message);
                    break;
                },
                Err(e) => {
                    result.counts.attempted += 1;
                    result.counts.parse_failed += 1;
                    report_row_error(spec, result, e.to_string());
                    continue;
                },
            };

            result.counts.attempted += 1;
            match spec.apply(&record) {
                Ok(row) => batch.push(row),
                Err(e) => {
                    result.counts.transform_failed += 1;
                    report_row_error(spec, result, format!("line {}: {}", record.line(), e));
                    continue;
                },
            }

            if batch.len() >= self.batch_size {
                self.flush(spec, &mut batch, result).await?;
            }
        }

        if !batch.is_empty() {
            self.flush(spec, &mut batch, result).await?;
        }

        Ok(())
    }

    async fn flush(
        &self,
        spec: &TableImportSpec,
        batch: &mut ImportBatch,
        result: &mut ImportResult,
    ) -> Result<(), ImportError> {
        let outcomes = self.store.write_batch(spec, batch).await?;

        for outcome in outcomes {
            match outcome {
                RowOutcome::Inserted => result.counts.inserted += 1,
                RowOutcome::Updated => result.counts.updated += 1,
                RowOutcome::Unchanged => result.counts.unchanged += 1,
                RowOutcome::Failed(e) => {
                    result.counts.write_failed += 1;
                    report_row_error(spec, result, e.to_string());
                },
            }
        }

        debug!(
            table = spec.table,
            rows = batch.len(),
            inserted = result.counts.inserted,
            updated = result.counts.updated,
            "Batch flushed"
        );

        batch.clear();
        Ok(())
    }
}

fn report_row_error(spec: &TableImportSpec, result: &mut ImportResult, message: String) {
    if result.sample_error(message.clone()) {
        error!(table = spec.table, error = %message, "Row failed");
    } else {
        debug!(table = spec.table, error = %message, "Row failed");
    }
}
