//! Per-table import results and the run summary

use chrono::{DateTime, Utc};
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Table};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    Completed,
    SourceAbsent,
    SourceUnreadable,
    /// Stopped by a connectivity failure part-way through
    Aborted,
    /// Not reached because an earlier table hit a connectivity failure
    NotRun,
}

impl fmt::Display for TableStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TableStatus::Completed => "completed",
            TableStatus::SourceAbsent => "source absent",
            TableStatus::SourceUnreadable => "source unreadable",
            TableStatus::Aborted => "aborted",
            TableStatus::NotRun => "not run",
        };
        f.write_str(label)
    }
}

/// Row counters for one table
///
/// For a completed table `attempted == succeeded() + parse_failed +
/// transform_failed + write_failed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RowCounts {
    pub attempted: u64,
    pub inserted: u64,
    pub updated: u64,
    pub unchanged: u64,
    pub parse_failed: u64,
    pub transform_failed: u64,
    pub write_failed: u64,
}

impl RowCounts {
    /// Rows written by a successfully applied upsert, changed or not
    pub fn succeeded(&self) -> u64 {
        self.inserted + self.updated + self.unchanged
    }

    pub fn failed(&self) -> u64 {
        self.parse_failed + self.transform_failed + self.write_failed
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportResult {
    pub table: String,
    pub source: PathBuf,
    pub status: TableStatus,
    #[serde(flatten)]
    pub counts: RowCounts,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Why the table did not complete normally
    pub note: Option<String>,
    /// Set when the source stream failed before its end
    pub read_error: Option<String>,
    /// Representative row-level errors, bounded by `max_error_samples`
    pub errors: Vec<String>,
    #[serde(skip)]
    max_error_samples: usize,
}

impl ImportResult {
    pub fn start(table: &str, source: &Path, max_error_samples: usize) -> Self {
        Self {
            table: table.to_string(),
            source: source.to_path_buf(),
            status: TableStatus::Completed,
            counts: RowCounts::default(),
            started_at: Utc::now(),
            finished_at: None,
            note: None,
            read_error: None,
            errors: Vec::new(),
            max_error_samples,
        }
    }

    pub fn not_run(table: &str, source: &Path) -> Self {
        let mut result = Self::start(table, source, 0);
        result.status = TableStatus::NotRun;
        result
    }

    /// Keep an error message if the sample list has room; returns whether it was kept
    pub fn sample_error(&mut self, message: impl Into<String>) -> bool {
        if self.errors.len() < self.max_error_samples {
            self.errors.push(message.into());
            true
        } else {
            false
        }
    }

    pub fn finish(&mut self, status: TableStatus, note: Option<String>) {
        self.status = status;
        self.note = note;
        self.finished_at = Some(Utc::now());
    }

    pub fn succeeded(&self) -> u64 {
        self.counts.succeeded()
    }

    pub fn failed(&self) -> u64 {
        self.counts.failed()
    }

    pub fn duration_secs(&self) -> Option<f64> {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds() as f64 / 1000.0)
    }
}

/// Outcome of a whole run, one entry per selected table in import order
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub tables: Vec<ImportResult>,
    /// The connectivity failure that ended the run early
    pub fatal_error: Option<String>,
}

impl RunSummary {
    /// Summary for a run that never reached the data store: every planned
    /// table is reported as not run
    pub fn not_started(planned: Vec<ImportResult>, fatal_error: impl fmt::Display) -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            started_at: now,
            finished_at: now,
            tables: planned,
            fatal_error: Some(fatal_error.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.fatal_error.is_none()
    }

    /// Process exit status: 1 only when the run was cut short by the store
    pub fn exit_code(&self) -> u8 {
        if self.is_success() {
            0
        } else {
            1
        }
    }

    pub fn totals(&self) -> RowCounts {
        self.tables.iter().fold(RowCounts::default(), |mut acc, t| {
            acc.attempted += t.counts.attempted;
            acc.inserted += t.counts.inserted;
            acc.updated += t.counts.updated;
            acc.unchanged += t.counts.unchanged;
            acc.parse_failed += t.counts.parse_failed;
            acc.transform_failed += t.counts.transform_failed;
            acc.write_failed += t.counts.write_failed;
            acc
        })
    }

    pub fn get(&self, table: &str) -> Option<&ImportResult> {
        self.tables.iter().find(|t| t.table == table)
    }

    pub fn render_table(&self) -> String {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec![
                "Table",
                "Status",
                "Attempted",
                "Succeeded",
                "Inserted",
                "Updated",
                "Unchanged",
                "Parse failed",
                "Transform failed",
                "Write failed",
            ]);

        for result in &self.tables {
            let mut row = vec![Cell::new(&result.table), Cell::new(result.status)];
            if result.status == TableStatus::NotRun {
                row.extend((0..8).map(|_| Cell::new("-")));
            } else {
                row.extend(count_cells(&result.counts));
            }
            table.add_row(row);
        }

        let mut total = vec![Cell::new("total"), Cell::new("")];
        total.extend(count_cells(&self.totals()));
        table.add_row(total);

        let mut out = format!("{}\n", table);
        for result in &self.tables {
            if let Some(note) = &result.note {
                out.push_str(&format!("{}: {}\n", result.table, note));
            }
            if let Some(read_error) = &result.read_error {
                out.push_str(&format!("{}: read aborted: {}\n", result.table, read_error));
            }
        }
        if let Some(fatal) = &self.fatal_error {
            out.push_str(&format!("Run aborted: {}\n", fatal));
        }
        out
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn count_cells(counts: &RowCounts) -> Vec<Cell> {
    [
        counts.attempted,
        counts.succeeded(),
        counts.inserted,
        counts.updated,
        counts.unchanged,
        counts.parse_failed,
        counts.transform_failed,
        counts.write_failed,
    ]
    .into_iter()
    .map(Cell::new)
    .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn completed(table: &str, counts: RowCounts) -> ImportResult {
        let mut result = ImportResult::start(table, Path::new("data/latest/x.csv.gz"), 5);
        result.counts = counts;
        result.finish(TableStatus::Completed, None);
        result
    }

    fn summary(tables: Vec<ImportResult>, fatal_error: Option<String>) -> RunSummary {
        RunSummary {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            tables,
            fatal_error,
        }
    }

    #[test]
    fn test_error_samples_are_bounded() {
        let mut result = ImportResult::start("parts", Path::new("parts.csv.gz"), 2);
        assert!(result.sample_error("one"));
        assert!(result.sample_error("two"));
        assert!(!result.sample_error("three"));
        assert_eq!(result.errors, vec!["one", "two"]);
    }

    #[test]
    fn test_counts() {
        let counts = RowCounts {
            attempted: 10,
            inserted: 4,
            updated: 2,
            unchanged: 1,
            parse_failed: 1,
            transform_failed: 1,
            write_failed: 1,
        };
        assert_eq!(counts.succeeded(), 7);
        assert_eq!(counts.failed(), 3);
        assert_eq!(counts.attempted, counts.succeeded() + counts.failed());
    }

    #[test]
    fn test_exit_code_only_reflects_fatal_errors() {
        let row_failures = RowCounts {
            attempted: 3,
            inserted: 1,
            write_failed: 2,
            ..RowCounts::default()
        };
        assert_eq!(summary(vec![completed("colors", row_failures)], None).exit_code(), 0);
        assert_eq!(
            summary(vec![], Some("data store connectivity failure: refused".into())).exit_code(),
            1
        );
    }

    #[test]
    fn test_render_lists_not_run_tables() {
        let themes = completed(
            "themes",
            RowCounts {
                attempted: 2,
                inserted: 2,
                ..RowCounts::default()
            },
        );
        let sets = ImportResult::not_run("sets", Path::new("sets.csv.gz"));
        let rendered = summary(vec![themes, sets], Some("pool timed out".into())).render_table();

        assert!(rendered.contains("themes"));
        assert!(rendered.contains("completed"));
        assert!(rendered.contains("not run"));
        assert!(rendered.contains("Run aborted: pool timed out"));
    }

    #[test]
    fn test_not_started_reports_every_table() {
        let planned = vec![
            ImportResult::not_run("themes", Path::new("data/latest/themes.csv.gz")),
            ImportResult::not_run("colors", Path::new("data/latest/colors.csv.gz")),
        ];
        let summary = RunSummary::not_started(planned, "data store connectivity failure: refused");

        assert_eq!(summary.exit_code(), 1);
        assert_eq!(summary.tables.len(), 2);
        assert!(summary.tables.iter().all(|t| t.status == TableStatus::NotRun));
        assert_eq!(summary.totals().attempted, 0);
        assert!(summary
            .render_table()
            .contains("Run aborted: data store connectivity failure: refused"));
    }

    #[test]
    fn test_json_flattens_counts() {
        let themes = completed(
            "themes",
            RowCounts {
                attempted: 2,
                inserted: 2,
                ..RowCounts::default()
            },
        );
        let json: serde_json::Value =
            serde_json::from_str(&summary(vec![themes], None).to_json().unwrap()).unwrap();
        let table = &json["tables"][0];
        assert_eq!(table["table"], "themes");
        assert_eq!(table["status"], "completed");
        assert_eq!(table["inserted"], 2);
        assert!(table.get("max_error_samples").is_none());
    }
}
