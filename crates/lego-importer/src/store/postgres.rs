//! Postgres implementation of [`CatalogStore`]
//!
//! Each batch runs in one transaction with a savepoint around every row, so a
//! rejected row is rolled back on its own and the rest of the batch commits.

use super::{CatalogStore, ImportLogEntry, RowOutcome};
use crate::engine::ImportBatch;
use crate::error::{ImportError, WriteError};
use crate::registry::{SqlValue, TableImportSpec};
use async_trait::async_trait;
use lego_common::db::{create_pool, DbConfig, DbResult};
use sqlx::postgres::{PgArguments, PgPool};
use sqlx::query::QueryScalar;
use sqlx::Postgres;
use tracing::debug;

/// SQLSTATE classes that mean the server or session is unusable
const FATAL_SQLSTATE_CLASSES: &[&str] = &["08", "28", "3D", "53", "57P"];

pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    /// Create the run's pool and verify the database answers
    pub async fn connect(config: &DbConfig) -> DbResult<Self> {
        Ok(Self {
            pool: create_pool(config).await?,
        })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn write_batch(
        &self,
        spec: &TableImportSpec,
        batch: &ImportBatch,
    ) -> Result<Vec<RowOutcome>, ImportError> {
        let sql = upsert_sql(spec);
        let mut outcomes = Vec::with_capacity(batch.len());

        let mut tx = self.pool.begin().await.map_err(connectivity)?;

        for row in batch.rows() {
            sqlx::query("SAVEPOINT upsert_row")
                .execute(&mut *tx)
                .await
                .map_err(connectivity)?;

            let query = row
                .values()
                .iter()
                .fold(sqlx::query_scalar::<_, bool>(&sql), bind_value);

            match query.fetch_optional(&mut *tx).await {
                Ok(returned) => {
                    sqlx::query("RELEASE SAVEPOINT upsert_row")
                        .execute(&mut *tx)
                        .await
                        .map_err(connectivity)?;

                    outcomes.push(match returned {
                        Some(true) => RowOutcome::Inserted,
                        Some(false) => RowOutcome::Updated,
                        None => RowOutcome::Unchanged,
                    });
                },
                Err(e) if !is_connectivity_error(&e) => {
                    sqlx::query("ROLLBACK TO SAVEPOINT upsert_row")
                        .execute(&mut *tx)
                        .await
                        .map_err(connectivity)?;

                    outcomes.push(RowOutcome::Failed(WriteError {
                        table: spec.table.to_string(),
                        key: spec.key_of(row),
                        message: describe(&e),
                    }));
                },
                Err(e) => return Err(connectivity(e)),
            }
        }

        tx.commit().await.map_err(connectivity)?;

        debug!(table = spec.table, rows = batch.len(), "Batch committed");
        Ok(outcomes)
    }

    async fn record_import(&self, entry: &ImportLogEntry) -> Result<(), ImportError> {
        sqlx::query(
            r#"
            INSERT INTO import_logs
                (table_name, operation, records_affected, import_started_at, notes)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&entry.table_name)
        .bind(&entry.operation)
        .bind(entry.records_affected)
        .bind(entry.import_started_at)
        .bind(entry.notes.as_deref())
        .execute(&self.pool)
        .await
        .map(|_| ())
        .map_err(|e| ImportError::Audit(describe(&e)))
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// Build the per-table upsert statement
///
/// Returns `inserted = true` for a new row, `false` for an overwritten row,
/// and no row when the existing values were already identical.
pub fn upsert_sql(spec: &TableImportSpec) -> String {
    let placeholders = (1..=spec.columns.len())
        .map(|i| format!("${}", i))
        .collect::<Vec<_>>()
        .join(", ");

    let updates = spec.update_columns();
    let action = if updates.is_empty() {
        "DO NOTHING".to_string()
    } else {
        let assignments = updates
            .iter()
            .map(|c| format!("{c} = EXCLUDED.{c}"))
            .collect::<Vec<_>>()
            .join(", ");
        let current = updates.iter().map(|c| format!("cur.{c}")).collect::<Vec<_>>().join(", ");
        let incoming = updates
            .iter()
            .map(|c| format!("EXCLUDED.{c}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!("DO UPDATE SET {assignments} WHERE ({current}) IS DISTINCT FROM ({incoming})")
    };

    format!(
        "INSERT INTO {table} AS cur ({columns}) VALUES ({placeholders}) \
         ON CONFLICT ({key}) {action} RETURNING (xmax = 0) AS inserted",
        table = spec.table,
        columns = spec.columns.join(", "),
        key = spec.conflict_key.join(", "),
    )
}

fn bind_value<'q>(
    query: QueryScalar<'q, Postgres, bool, PgArguments>,
    value: &'q SqlValue,
) -> QueryScalar<'q, Postgres, bool, PgArguments> {
    match value {
        SqlValue::Integer(n) => query.bind(*n),
        SqlValue::Text(s) => query.bind(s.as_deref()),
        SqlValue::Boolean(b) => query.bind(*b),
    }
}

/// Whether an error means the store is unusable rather than one row being bad
pub fn is_connectivity_error(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.code().is_some_and(|code| is_fatal_sqlstate(&code)),
        sqlx::Error::Encode(_) => false,
        _ => true,
    }
}

fn is_fatal_sqlstate(code: &str) -> bool {
    FATAL_SQLSTATE_CLASSES.iter().any(|class| code.starts_with(class))
}

fn connectivity(err: sqlx::Error) -> ImportError {
    ImportError::Connectivity(describe(&err))
}

fn describe(err: &sqlx::Error) -> String {
    match err {
        sqlx::Error::Database(db) => match db.code() {
            Some(code) => format!("{} (SQLSTATE {})", db.message(), code),
            None => db.message().to_string(),
        },
        other => other.to_string(),
    }
}
