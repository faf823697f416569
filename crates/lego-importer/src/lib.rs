//! Lego Collector catalog importer
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Loads the nine gzip-compressed catalog extracts (themes, colors, parts,
//! sets, inventories, minifigs and their link tables) into Postgres with
//! idempotent, dependency-ordered upserts.
//!
//! # Pipeline
//!
//! - **Source**: lazy record stream over a (gzip) CSV file
//! - **Registry**: per-table columns, conflict key and transform
//! - **Engine**: bounded batches of upserts with per-row failure isolation
//! - **Orchestrator**: fixed table order, continue-on-error, fatal abort
//! - **Audit**: one `import_logs` row per finished table

pub mod audit;
pub mod config;
pub mod engine;
pub mod error;
pub mod orchestrator;
pub mod registry;
pub mod result;
pub mod source;
pub mod store;

pub use config::{CompressionMode, ImportConfig, OutputFormat};
pub use error::{ImportError, ParseError, TransformError, WriteError};
pub use orchestrator::ImportOrchestrator;
pub use result::{ImportResult, RunSummary, TableStatus};
pub use store::{CatalogStore, PgCatalogStore};

use clap::Parser;
use std::path::PathBuf;

/// Import the catalog extracts into the Lego Collector database
#[derive(Parser, Debug)]
#[command(name = "lego-importer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory containing the *.csv.gz extracts
    #[arg(long, env = "IMPORT_DATA_DIR", default_value = config::DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Rows per write batch
    #[arg(long, env = "IMPORT_BATCH_SIZE", default_value_t = config::DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// How to decompress source files
    #[arg(long, env = "IMPORT_COMPRESSION", value_enum, default_value_t = CompressionMode::Auto)]
    pub compression: CompressionMode,

    /// Representative row errors kept per table
    #[arg(
        long,
        env = "IMPORT_MAX_ERROR_SAMPLES",
        default_value_t = config::DEFAULT_MAX_ERROR_SAMPLES
    )]
    pub max_error_samples: usize,

    /// Only import these tables (repeatable); order is always the dependency order
    #[arg(long = "table", value_name = "TABLE")]
    pub tables: Vec<String>,

    /// Summary format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn import_config(&self) -> ImportConfig {
        ImportConfig {
            data_dir: self.data_dir.clone(),
            batch_size: self.batch_size,
            compression: self.compression,
            max_error_samples: self.max_error_samples,
            tables: self.tables.clone(),
        }
    }
}
