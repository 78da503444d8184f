//! Postgres implementation of the repository traits.

mod accounts;
mod appointments;
mod cases;
mod forum;
mod growth;
mod trainings;
mod videos;

use async_trait::async_trait;
use sqlx::{Executor, PgPool};
use tracing::info;

use crate::database::repository::{DbResult, StoreHealth};

const SCHEMA: &str = include_str!("../schema.sql");

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create missing tables and seed default forum categories.
    pub async fn apply_schema(&self) -> DbResult<()> {
        self.pool.execute(SCHEMA).await?;
        info!("Database schema is up to date");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("Closed database pool");
    }
}

#[async_trait]
impl StoreHealth for PgStore {
    async fn ping(&self) -> DbResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
