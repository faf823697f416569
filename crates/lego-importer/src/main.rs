//! lego-importer - Main entry point

use anyhow::{Context, Result};
use clap::Parser;
use lego_common::db::DbConfig;
use lego_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use lego_importer::registry::TableRegistry;
use lego_importer::{
    CatalogStore, Cli, ImportError, ImportOrchestrator, ImportResult, OutputFormat,
    PgCatalogStore, RunSummary,
};
use std::process::ExitCode;
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    // .env is optional
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_config = LogConfig::builder()
        .level(if cli.verbose { LogLevel::Debug } else { LogLevel::Info })
        .output(LogOutput::Console)
        .log_file_prefix("lego-importer")
        .filter_directives("sqlx=warn")
        .build();

    // Environment variables take precedence over the flags
    let log_config = log_config.clone().merge_env().unwrap_or(log_config);

    let _guard = match init_logging(&log_config) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: logging disabled: {:#}", e);
            None
        },
    };

    match run(&cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!(error = %e, "Import failed");
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        },
    }
}

async fn run(cli: &Cli) -> Result<u8> {
    let config = cli.import_config();
    config.validate().context("Invalid import configuration")?;
    let registry = TableRegistry::standard()?;
    let planned: Vec<ImportResult> = registry
        .select(&config.tables)
        .context("Invalid table selection")?
        .into_iter()
        .map(|spec| ImportResult::not_run(spec.table, &config.source_path(spec)))
        .collect();

    let db_config = DbConfig::from_env().context("Invalid database configuration")?;

    let store = match PgCatalogStore::connect(&db_config).await {
        Ok(store) => store,
        Err(e) => {
            error!(
                database = %db_config.target.redacted(),
                error = %e,
                "Failed to connect to the catalog database"
            );
            let fatal = ImportError::Connectivity(e.to_string());
            let summary = RunSummary::not_started(planned, fatal);
            print_summary(&summary, cli.output)?;
            return Ok(summary.exit_code());
        },
    };

    let summary = match ImportOrchestrator::with_registry(&store, config, &registry) {
        Ok(orchestrator) => orchestrator.run().await,
        Err(e) => {
            store.close().await;
            return Err(e).context("Invalid import configuration");
        },
    };
    store.close().await;

    print_summary(&summary, cli.output)?;
    Ok(summary.exit_code())
}

fn print_summary(summary: &RunSummary, output: OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Table => print!("{}", summary.render_table()),
        OutputFormat::Json => println!("{}", summary.to_json()?),
    }
    Ok(())
}
