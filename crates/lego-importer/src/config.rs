//! Importer run configuration

use crate::error::ImportError;
use crate::registry::TableImportSpec;
use clap::ValueEnum;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Default directory holding the nine source files
pub const DEFAULT_DATA_DIR: &str = "data/latest";

/// Default number of rows per write batch
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Default number of representative errors kept per table
pub const DEFAULT_MAX_ERROR_SAMPLES: usize = 5;

/// How source files are decompressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionMode {
    /// Gzip when the file name ends in `.gz`
    #[default]
    Auto,
    Gzip,
    Plain,
}

impl CompressionMode {
    pub fn is_gzip(self, path: &Path) -> bool {
        match self {
            CompressionMode::Auto => path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("gz")),
            CompressionMode::Gzip => true,
            CompressionMode::Plain => false,
        }
    }
}

/// Rendering of the final run summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Debug, Clone)]
pub struct ImportConfig {
    pub data_dir: PathBuf,
    pub batch_size: usize,
    pub compression: CompressionMode,
    pub max_error_samples: usize,
    /// Restrict the run to these tables; empty means all
    pub tables: Vec<String>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            batch_size: DEFAULT_BATCH_SIZE,
            compression: CompressionMode::Auto,
            max_error_samples: DEFAULT_MAX_ERROR_SAMPLES,
            tables: Vec::new(),
        }
    }
}

impl ImportConfig {
    pub fn validate(&self) -> Result<(), ImportError> {
        if self.batch_size == 0 {
            return Err(ImportError::Config("batch size must be greater than 0".to_string()));
        }

        if self.data_dir.as_os_str().is_empty() {
            return Err(ImportError::Config("data directory cannot be empty".to_string()));
        }

        Ok(())
    }

    /// Location of a table's source file under the data directory
    pub fn source_path(&self, spec: &TableImportSpec) -> PathBuf {
        self.data_dir.join(spec.source_file)
    }
}
