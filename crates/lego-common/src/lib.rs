//! Lego Collector Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Ambient pieces shared by the catalog importer and the query layer that
//! reads the tables it populates.
//!
//! - **Logging**: tracing subscriber configuration (console, file, JSON)
//! - **Database**: connection settings and Postgres pool creation
//!
//! # Example
//!
//! ```no_run
//! use lego_common::db::{create_pool, DbConfig};
//! use lego_common::logging::{init_logging, LogConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     init_logging(&LogConfig::from_env()?)?;
//!     let pool = create_pool(&DbConfig::from_env()?).await?;
//!     pool.close().await;
//!     Ok(())
//! }
//! ```

pub mod db;
pub mod logging;

pub use db::{DbConfig, DbError, DbResult};
