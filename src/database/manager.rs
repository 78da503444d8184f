use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::ConnectOptions;
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::database::memory::MemoryStore;
use crate::database::postgres::PgStore;
use crate::database::repository::Store;

/// Errors from the storage layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unique constraint violated: {0}")]
    Conflict(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                let constraint = db_err.constraint().unwrap_or("unique").to_string();
                DatabaseError::Conflict(constraint)
            }
            sqlx::Error::ColumnDecode { index, source } => {
                DatabaseError::QueryError(format!("failed to decode column {}: {}", index, source))
            }
            other => DatabaseError::Sqlx(other),
        }
    }
}

/// A connected storage backend.
#[derive(Clone)]
pub enum Backend {
    Postgres(Arc<PgStore>),
    Memory(Arc<MemoryStore>),
}

impl Backend {
    /// The backend behind the repository traits services are written against.
    pub fn store(&self) -> Arc<dyn Store> {
        match self {
            Backend::Postgres(store) => store.clone(),
            Backend::Memory(store) => store.clone(),
        }
    }

    pub async fn close(&self) {
        if let Backend::Postgres(store) = self {
            store.close().await;
        }
    }
}

/// Opens the configured backend. Owns no state itself; the returned handle
/// is threaded through `AppState` and dropped with it.
pub struct DatabaseManager;

impl DatabaseManager {
    pub async fn connect(config: &DatabaseConfig) -> Result<Backend, DatabaseError> {
        if config.url.trim().is_empty() {
            return Err(DatabaseError::ConfigMissing("DATABASE_URL"));
        }
        if config.url == "memory" {
            info!("Using in-memory store");
            return Ok(Backend::Memory(Arc::new(MemoryStore::new())));
        }

        Self::validate_url(&config.url)?;

        let mut options = PgConnectOptions::from_str(&config.url)?;
        if !config.enable_query_logging {
            options = options.disable_statement_logging();
        }

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect_with(options)
            .await?;

        let store = PgStore::new(pool);
        store.apply_schema().await?;

        info!(
            "Connected to Postgres (max_connections={})",
            config.max_connections
        );
        Ok(Backend::Postgres(Arc::new(store)))
    }

    /// Accept only postgres:// or postgresql:// URLs that name a database.
    fn validate_url(raw: &str) -> Result<(), DatabaseError> {
        let url = url::Url::parse(raw).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        if !matches!(url.scheme(), "postgres" | "postgresql") {
            return Err(DatabaseError::InvalidDatabaseUrl);
        }
        if url.path().trim_start_matches('/').is_empty() {
            return Err(DatabaseError::InvalidDatabaseUrl);
        }
        Ok(())
    }
}
