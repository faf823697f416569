//! Dependency-ordered import orchestrator
//!
//! Runs the selected tables one at a time in [`IMPORT_ORDER`]. Missing or
//! unreadable sources and row-level failures are recorded and the run moves
//! on; a connectivity failure stops the run and the remaining tables are
//! reported as not run.
//!
//! [`IMPORT_ORDER`]: crate::registry::IMPORT_ORDER

use crate::audit;
use crate::config::ImportConfig;
use crate::engine::BatchUpsertEngine;
use crate::error::ImportError;
use crate::registry::{TableImportSpec, TableRegistry};
use crate::result::{ImportResult, RunSummary, TableStatus};
use crate::source::SourceReader;
use crate::store::CatalogStore;
use chrono::{DateTime, Utc};
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

pub struct ImportOrchestrator<'a, S: CatalogStore + ?Sized> {
    store: &'a S,
    config: ImportConfig,
    tables: Vec<TableImportSpec>,
}

impl<'a, S: CatalogStore + ?Sized> ImportOrchestrator<'a, S> {
    /// Orchestrator over the standard nine-table registry
    pub fn new(store: &'a S, config: ImportConfig) -> Result<Self, ImportError> {
        Self::with_registry(store, config, &TableRegistry::standard()?)
    }

    pub fn with_registry(
        store: &'a S,
        config: ImportConfig,
        registry: &TableRegistry,
    ) -> Result<Self, ImportError> {
        config.validate()?;
        let tables = registry.select(&config.tables)?.into_iter().copied().collect();
        Ok(Self {
            store,
            config,
            tables,
        })
    }

    /// Table names this orchestrator will run, in order
    pub fn planned_tables(&self) -> Vec<&'static str> {
        self.tables.iter().map(|spec| spec.table).collect()
    }

    pub async fn run(&self) -> RunSummary {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();

        let tables = async {
            info!(
                data_dir = %self.config.data_dir.display(),
                batch_size = self.config.batch_size,
                tables = self.tables.len(),
                "Starting catalog import"
            );

            let mut results = Vec::with_capacity(self.tables.len());
            let mut fatal: Option<ImportError> = None;

            for spec in &self.tables {
                if fatal.is_some() {
                    results.push(ImportResult::not_run(spec.table, &self.config.source_path(spec)));
                    continue;
                }

                let (result, error) = self
                    .import_table(spec, started_at)
                    .instrument(info_span!("import_table", table = spec.table))
                    .await;

                if let Some(e) = error {
                    error!(table = spec.table, error = %e, "Import aborted");
                    fatal = Some(e);
                }
                results.push(result);
            }

            (results, fatal)
        }
        .instrument(info_span!("import_run", %run_id))
        .await;

        let (tables, fatal) = tables;
        let summary = RunSummary {
            run_id,
            started_at,
            finished_at: Utc::now(),
            tables,
            fatal_error: fatal.map(|e| e.to_string()),
        };

        let totals = summary.totals();
        info!(
            %run_id,
            succeeded = totals.succeeded(),
            failed = totals.failed(),
            aborted = !summary.is_success(),
            "Catalog import finished"
        );

        summary
    }

    /// Import one table; the error is set only for a run-ending failure
    async fn import_table(
        &self,
        spec: &TableImportSpec,
        run_started_at: DateTime<Utc>,
    ) -> (ImportResult, Option<ImportError>) {
        let source = self.config.source_path(spec);
        let mut result = ImportResult::start(spec.table, &source, self.config.max_error_samples);

        let records = match SourceReader::open(&source, self.config.compression) {
            Ok(records) => records,
            Err(e) => {
                let status = match e {
                    ImportError::SourceAbsent(_) => TableStatus::SourceAbsent,
                    _ => TableStatus::SourceUnreadable,
                };
                warn!(error = %e, "Skipping table");
                result.finish(status, Some(e.to_string()));
                audit::record(self.store, &result, run_started_at).await;
                return (result, None);
            },
        };

        let engine = BatchUpsertEngine::new(self.store, self.config.batch_size);
        match engine.run(spec, records, &mut result).await {
            Ok(()) => {
                result.finish(TableStatus::Completed, None);
                let c = result.counts;
                info!(
                    attempted = c.attempted,
                    inserted = c.inserted,
                    updated = c.updated,
                    unchanged = c.unchanged,
                    parse_failed = c.parse_failed,
                    transform_failed = c.transform_failed,
                    write_failed = c.write_failed,
                    duration_secs = result.duration_secs().unwrap_or_default(),
                    "Table imported"
                );
                audit::record(self.store, &result, run_started_at).await;
                (result, None)
            },
            Err(e) => {
                result.finish(TableStatus::Aborted, Some(e.to_string()));
                (result, Some(e))
            },
        }
    }
}
