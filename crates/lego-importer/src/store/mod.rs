//! Data-store seam for the import pipeline
//!
//! The engine and orchestrator only talk to [`CatalogStore`]; the Postgres
//! implementation lives in [`postgres`].

pub mod postgres;

use crate::engine::ImportBatch;
use crate::error::{ImportError, WriteError};
use crate::registry::TableImportSpec;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

pub use postgres::PgCatalogStore;

/// Result of upserting one row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    /// No row with this conflict key existed
    Inserted,
    /// An existing row had different values and was overwritten
    Updated,
    /// An existing row already held identical values
    Unchanged,
    /// The store rejected this row; the batch carried on
    Failed(WriteError),
}

/// One persisted audit record per table import
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportLogEntry {
    pub table_name: String,
    pub operation: String,
    pub records_affected: i64,
    pub import_started_at: DateTime<Utc>,
    pub notes: Option<String>,
}

/// Where catalog rows and audit entries are written
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Upsert a batch row by row, returning one outcome per row in order
    ///
    /// Row-level rejections are reported as [`RowOutcome::Failed`]. An `Err`
    /// means the store itself is unusable ([`ImportError::Connectivity`]).
    async fn write_batch(
        &self,
        spec: &TableImportSpec,
        batch: &ImportBatch,
    ) -> Result<Vec<RowOutcome>, ImportError>;

    /// Persist an audit entry
    async fn record_import(&self, entry: &ImportLogEntry) -> Result<(), ImportError>;

    /// Release the underlying connections
    async fn close(&self);
}
