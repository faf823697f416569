//! Shared fixtures for importer integration tests
#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use flate2::write::GzEncoder;
use flate2::Compression;
use lego_importer::engine::ImportBatch;
use lego_importer::error::{ImportError, WriteError};
use lego_importer::registry::{SqlValue, TableImportSpec};
use lego_importer::store::{CatalogStore, ImportLogEntry, RowOutcome};
use lego_importer::ImportConfig;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

/// (table, column, referenced table) foreign keys enforced by [`MemoryStore`]
const FOREIGN_KEYS: &[(&str, &str, &str)] = &[
    ("themes", "parent_id", "themes"),
    ("parts", "part_cat_id", "part_categories"),
    ("sets", "theme_id", "themes"),
    ("inventory_parts", "inventory_id", "inventories"),
    ("inventory_parts", "part_num", "parts"),
    ("inventory_parts", "color_id", "colors"),
    ("inventory_minifigs", "inventory_id", "inventories"),
    ("inventory_minifigs", "fig_num", "minifigs"),
];

#[derive(Default)]
struct State {
    tables: HashMap<String, BTreeMap<String, Vec<SqlValue>>>,
    logs: Vec<ImportLogEntry>,
    batches: usize,
    closed: bool,
}

/// In-memory catalog with upsert-by-key and foreign-key checks
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    /// Tables whose writes fail as if the database went away
    unreachable_tables: Vec<String>,
    /// Reject every audit insert
    audit_unavailable: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unreachable_for(table: &str) -> Self {
        Self {
            unreachable_tables: vec![table.to_string()],
            ..Self::default()
        }
    }

    pub fn without_audit() -> Self {
        Self {
            audit_unavailable: true,
            ..Self::default()
        }
    }

    pub fn count(&self, table: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .tables
            .get(table)
            .map_or(0, |rows| rows.len())
    }

    /// Row by its conflict-key display value (e.g. "15" or "1, 3001, 4, false")
    pub fn row(&self, table: &str, key: &str) -> Option<Vec<SqlValue>> {
        self.state
            .lock()
            .unwrap()
            .tables
            .get(table)
            .and_then(|rows| rows.get(key).cloned())
    }

    pub fn snapshot(&self) -> HashMap<String, BTreeMap<String, Vec<SqlValue>>> {
        self.state.lock().unwrap().tables.clone()
    }

    pub fn logs(&self) -> Vec<ImportLogEntry> {
        self.state.lock().unwrap().logs.clone()
    }

    pub fn batches(&self) -> usize {
        self.state.lock().unwrap().batches
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }
}

fn dangling_reference(
    tables: &HashMap<String, BTreeMap<String, Vec<SqlValue>>>,
    spec: &TableImportSpec,
    key: &str,
    values: &[SqlValue],
) -> Option<String> {
    for (table, column, referenced) in FOREIGN_KEYS {
        if *table != spec.table {
            continue;
        }
        let Some(idx) = spec.columns.iter().position(|c| c == column) else {
            continue;
        };
        let value = &values[idx];
        if matches!(value, SqlValue::Integer(None) | SqlValue::Text(None)) {
            continue;
        }
        let target = value.to_string();
        let self_row = *referenced == spec.table && target == key;
        let exists = tables.get(*referenced).is_some_and(|rows| rows.contains_key(&target));
        if !exists && !self_row {
            return Some(format!(
                "insert on table \"{}\" violates foreign key: {}={} not present in \"{}\"",
                table, column, target, referenced
            ));
        }
    }
    None
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn write_batch(
        &self,
        spec: &TableImportSpec,
        batch: &ImportBatch,
    ) -> Result<Vec<RowOutcome>, ImportError> {
        if self.unreachable_tables.iter().any(|t| t == spec.table) {
            return Err(ImportError::Connectivity(
                "connection refused (SQLSTATE 08006)".to_string(),
            ));
        }

        let mut state = self.state.lock().unwrap();
        state.batches += 1;

        let mut outcomes = Vec::with_capacity(batch.len());
        for row in batch.rows() {
            let key = spec.key_of(row);
            let values = row.values().to_vec();

            if let Some(message) = dangling_reference(&state.tables, spec, &key, &values) {
                outcomes.push(RowOutcome::Failed(WriteError {
                    table: spec.table.to_string(),
                    key,
                    message,
                }));
                continue;
            }

            let rows = state.tables.entry(spec.table.to_string()).or_default();
            let outcome = match rows.get(&key) {
                None => RowOutcome::Inserted,
                Some(existing) if *existing == values => RowOutcome::Unchanged,
                Some(_) => RowOutcome::Updated,
            };
            rows.insert(key, values);
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    async fn record_import(&self, entry: &ImportLogEntry) -> Result<(), ImportError> {
        if self.audit_unavailable {
            return Err(ImportError::Audit(
                "relation \"import_logs\" does not exist (SQLSTATE 42P01)".to_string(),
            ));
        }
        self.state.lock().unwrap().logs.push(entry.clone());
        Ok(())
    }

    async fn close(&self) {
        self.state.lock().unwrap().closed = true;
    }
}

/// A temporary data directory populated with gzip extracts
pub struct DataDir {
    dir: TempDir,
}

impl DataDir {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `<table>.csv.gz`
    pub fn write(&self, table: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(format!("{}.csv.gz", table));
        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        encoder.write_all(content.as_bytes()).unwrap();
        encoder.finish().unwrap();
        path
    }

    pub fn remove(&self, table: &str) {
        std::fs::remove_file(self.dir.path().join(format!("{}.csv.gz", table))).unwrap();
    }

    pub fn config(&self) -> ImportConfig {
        ImportConfig {
            data_dir: self.path().to_path_buf(),
            batch_size: 3,
            ..ImportConfig::default()
        }
    }

    /// A small, referentially consistent catalog covering all nine tables
    pub fn with_full_catalog() -> Self {
        let data = Self::new();
        data.write(
            "themes",
            "id,name,parent_id\n1,Technic,\n2,Technic Expert,1\n158,Star Wars,\n",
        );
        data.write(
            "colors",
            "id,name,rgb,is_trans\n\
             0,Black,05131D,f\n\
             4,Red,C91A09,f\n\
             15,White,FFFFFF,f\n\
             47,Trans-Clear,FCFCFC,t\n",
        );
        data.write("part_categories", "id,name\n11,Bricks\n14,Plates\n");
        data.write(
            "parts",
            "part_num,name,part_cat_id,part_material\n\
             3001,Brick 2 x 4,11,Plastic\n\
             3020,Plate 2 x 4,14,Plastic\n\
             3062b,Round Brick 1 x 1,11,Plastic\n",
        );
        data.write(
            "sets",
            "set_num,name,year,theme_id,num_parts,img_url\n\
             8880-1,Super Car,1994,1,1343,https://cdn.rebrickable.com/media/sets/8880-1.jpg\n\
             75192-1,Millennium Falcon,2017,158,7541,\
             https://cdn.rebrickable.com/media/sets/75192-1.jpg\n",
        );
        data.write(
            "inventories",
            "id,version,set_num\n1,1,8880-1\n2,1,75192-1\n3,1,fig-000001\n",
        );
        data.write(
            "minifigs",
            "fig_num,name,num_parts,img_url\n\
             fig-000001,Han Solo,4,https://cdn.rebrickable.com/media/sets/fig-000001.jpg\n",
        );
        data.write(
            "inventory_parts",
            "inventory_id,part_num,color_id,quantity,is_spare,img_url\n\
             1,3001,4,12,f,\n\
             1,3020,0,6,f,\n\
             1,3062b,47,2,t,\n\
             2,3001,15,40,f,\n",
        );
        data.write("inventory_minifigs", "inventory_id,fig_num,quantity\n2,fig-000001,1\n");
        data
    }
}

pub fn int(n: i32) -> SqlValue {
    SqlValue::Integer(Some(n))
}

pub fn text(s: &str) -> SqlValue {
    SqlValue::Text(Some(s.to_string()))
}
