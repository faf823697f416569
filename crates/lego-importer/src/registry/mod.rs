//! Transform registry: one statically-typed [`TableImportSpec`] per catalog table
//!
//! The registry holds the specs in [`IMPORT_ORDER`] and refuses to build if
//! a table would be imported before one it references.

pub mod coerce;
mod tables;

use crate::error::{ImportError, TransformError};
use crate::source::RawRecord;
use std::collections::HashSet;
use std::fmt;

/// Fixed import order; every table follows the tables it references
pub const IMPORT_ORDER: [&str; 9] = [
    "themes",
    "colors",
    "part_categories",
    "parts",
    "sets",
    "inventories",
    "minifigs",
    "inventory_parts",
    "inventory_minifigs",
];

/// A typed column value ready to be bound into a statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Integer(Option<i32>),
    Text(Option<String>),
    Boolean(bool),
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Integer(Some(n)) => write!(f, "{}", n),
            SqlValue::Text(Some(s)) => write!(f, "{}", s),
            SqlValue::Boolean(b) => write!(f, "{}", b),
            SqlValue::Integer(None) | SqlValue::Text(None) => write!(f, "null"),
        }
    }
}

/// Positional values matching a spec's column list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformedRow(Vec<SqlValue>);

impl TransformedRow {
    pub fn new(values: Vec<SqlValue>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

pub type TransformFn = fn(&RawRecord) -> Result<TransformedRow, TransformError>;

/// Everything needed to import one table
#[derive(Debug, Clone, Copy)]
pub struct TableImportSpec {
    pub table: &'static str,
    /// File name under the data directory
    pub source_file: &'static str,
    pub columns: &'static [&'static str],
    pub conflict_key: &'static [&'static str],
    /// Tables referenced by foreign key (self-references excluded)
    pub depends_on: &'static [&'static str],
    pub transform: TransformFn,
}

impl TableImportSpec {
    /// Run the transform and check the row has one value per column
    pub fn apply(&self, record: &RawRecord) -> Result<TransformedRow, TransformError> {
        let row = (self.transform)(record)?;
        if row.len() != self.columns.len() {
            return Err(TransformError::ColumnCount {
                table: self.table.to_string(),
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        Ok(row)
    }

    /// Columns overwritten on conflict
    pub fn update_columns(&self) -> Vec<&'static str> {
        self.columns
            .iter()
            .copied()
            .filter(|column| !self.conflict_key.contains(column))
            .collect()
    }

    /// Conflict-key values of a row, for error messages
    pub fn key_of(&self, row: &TransformedRow) -> String {
        self.columns
            .iter()
            .zip(row.values())
            .filter(|(column, _)| self.conflict_key.contains(*column))
            .map(|(_, value)| value.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Table name to spec, in import order
#[derive(Debug, Clone)]
pub struct TableRegistry {
    specs: Vec<TableImportSpec>,
}

impl TableRegistry {
    /// The nine catalog tables
    pub fn standard() -> Result<Self, ImportError> {
        Self::from_specs(tables::all())
    }

    /// Build a registry, validating names, keys and dependency order
    pub fn from_specs(specs: Vec<TableImportSpec>) -> Result<Self, ImportError> {
        let mut seen: HashSet<&str> = HashSet::new();

        for spec in &specs {
            if !IMPORT_ORDER.contains(&spec.table) {
                return Err(ImportError::UnknownTable(spec.table.to_string()));
            }
            if !seen.insert(spec.table) {
                return Err(ImportError::Config(format!(
                    "table '{}' is registered more than once",
                    spec.table
                )));
            }
            if spec.conflict_key.is_empty() {
                return Err(ImportError::Config(format!(
                    "table '{}' has no conflict key",
                    spec.table
                )));
            }
            if let Some(column) = spec.conflict_key.iter().find(|c| !spec.columns.contains(*c)) {
                return Err(ImportError::Config(format!(
                    "conflict key column '{}' is not a column of '{}'",
                    column, spec.table
                )));
            }
            if let Some(dep) = spec
                .depends_on
                .iter()
                .find(|dep| !seen.contains(*dep) || **dep == spec.table)
            {
                return Err(ImportError::Config(format!(
                    "table '{}' is ordered before its dependency '{}'",
                    spec.table, dep
                )));
            }
        }

        if let Some(missing) = IMPORT_ORDER.iter().find(|table| !seen.contains(*table)) {
            return Err(ImportError::Config(format!("table '{}' is not registered", missing)));
        }

        Ok(Self { specs })
    }

    pub fn get(&self, table: &str) -> Result<&TableImportSpec, ImportError> {
        self.specs
            .iter()
            .find(|spec| spec.table == table)
            .ok_or_else(|| ImportError::UnknownTable(table.to_string()))
    }

    pub fn ordered(&self) -> impl Iterator<Item = &TableImportSpec> {
        self.specs.iter()
    }

    /// The requested tables, in import order; an empty request selects all
    pub fn select(&self, tables: &[String]) -> Result<Vec<&TableImportSpec>, ImportError> {
        for table in tables {
            self.get(table)?;
        }
        Ok(self
            .specs
            .iter()
            .filter(|spec| tables.is_empty() || tables.iter().any(|t| t == spec.table))
            .collect())
    }
}
