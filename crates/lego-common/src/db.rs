//! Catalog database connection settings and pool creation

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::time::Duration;
use thiserror::Error;

/// Default host when no `DATABASE_URL` is given.
pub const DEFAULT_DB_HOST: &str = "localhost";

/// Default Postgres port.
pub const DEFAULT_DB_PORT: u16 = 5432;

/// Default database name.
pub const DEFAULT_DB_NAME: &str = "lego_collector";

/// Default user and password for local development.
pub const DEFAULT_DB_USER: &str = "postgres";
pub const DEFAULT_DB_PASSWORD: &str = "postgres";

/// Default maximum connections in the pool.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 2;

/// Default connection acquire timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Database errors with contextual information
#[derive(Error, Debug)]
pub enum DbError {
    /// SQL query or connection error
    #[error("Database query failed: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Connection settings are invalid or missing
    #[error("Database configuration error: {0}. Check DATABASE_URL or the DB_* variables.")]
    Config(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Where the catalog database lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbTarget {
    /// A full connection string (`DATABASE_URL`)
    Url(String),
    /// Discrete settings (`DB_HOST`, `DB_PORT`, `DB_NAME`, `DB_USER`, `DB_PASSWORD`)
    Parts {
        host: String,
        port: u16,
        database: String,
        user: String,
        password: String,
    },
}

impl DbTarget {
    /// Connection description that is safe to log (no password)
    pub fn redacted(&self) -> String {
        match self {
            DbTarget::Url(url) => match (url.find("://"), url.rfind('@')) {
                (Some(scheme_end), Some(at)) if at > scheme_end => {
                    format!("{}://***@{}", &url[..scheme_end], &url[at + 1..])
                },
                _ => url.clone(),
            },
            DbTarget::Parts {
                host,
                port,
                database,
                user,
                ..
            } => format!("postgresql://{}@{}:{}/{}", user, host, port, database),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub target: DbTarget,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            target: DbTarget::Parts {
                host: DEFAULT_DB_HOST.to_string(),
                port: DEFAULT_DB_PORT,
                database: DEFAULT_DB_NAME.to_string(),
                user: DEFAULT_DB_USER.to_string(),
                password: DEFAULT_DB_PASSWORD.to_string(),
            },
            max_connections: DEFAULT_MAX_CONNECTIONS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }
}

impl DbConfig {
    /// Read connection settings from the environment
    ///
    /// `DATABASE_URL` wins when set; otherwise the discrete `DB_*` variables
    /// are used, each falling back to its local-development default.
    pub fn from_env() -> DbResult<Self> {
        let target = match std::env::var("DATABASE_URL") {
            Ok(url) => DbTarget::Url(url),
            Err(_) => DbTarget::Parts {
                host: std::env::var("DB_HOST").unwrap_or_else(|_| DEFAULT_DB_HOST.to_string()),
                port: match std::env::var("DB_PORT") {
                    Ok(port) => port
                        .parse()
                        .map_err(|_| DbError::config(format!("DB_PORT '{}' is not a port", port)))?,
                    Err(_) => DEFAULT_DB_PORT,
                },
                database: std::env::var("DB_NAME").unwrap_or_else(|_| DEFAULT_DB_NAME.to_string()),
                user: std::env::var("DB_USER").unwrap_or_else(|_| DEFAULT_DB_USER.to_string()),
                password: std::env::var("DB_PASSWORD")
                    .unwrap_or_else(|_| DEFAULT_DB_PASSWORD.to_string()),
            },
        };

        let max_connections = std::env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_CONNECTIONS);

        let connect_timeout_secs = std::env::var("DB_CONNECT_TIMEOUT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS);

        let config = Self {
            target,
            max_connections,
            connect_timeout_secs,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> DbResult<()> {
        match &self.target {
            DbTarget::Url(url) if url.trim().is_empty() => {
                return Err(DbError::config("DATABASE_URL cannot be empty"));
            },
            DbTarget::Parts { host, .. } if host.trim().is_empty() => {
                return Err(DbError::config("DB_HOST cannot be empty"));
            },
            _ => {},
        }

        if self.max_connections == 0 {
            return Err(DbError::config("max_connections must be greater than 0"));
        }

        Ok(())
    }

    fn connect_options(&self) -> DbResult<PgConnectOptions> {
        match &self.target {
            DbTarget::Url(url) => url.parse().map_err(DbError::from),
            DbTarget::Parts {
                host,
                port,
                database,
                user,
                password,
            } => Ok(PgConnectOptions::new()
                .host(host)
                .port(*port)
                .database(database)
                .username(user)
                .password(password)),
        }
    }
}

impl DbError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

/// Open a pool against the configured database and verify it answers
pub async fn create_pool(config: &DbConfig) -> DbResult<PgPool> {
    config.validate()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .connect_with(config.connect_options()?)
        .await?;

    health_check(&pool).await?;

    tracing::info!(
        target_db = %config.target.redacted(),
        max_connections = config.max_connections,
        "Database connection pool created"
    );

    Ok(pool)
}

pub async fn health_check(pool: &PgPool) -> DbResult<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map(|_| ())
        .map_err(DbError::from)
}
