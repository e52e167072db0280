//! Database Connection Pool using sqlx

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::sync::Arc;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::database::contributors::ContributorRepository;
use crate::database::views::ContentViewRepository;
use crate::error::StoreResult;

pub struct DatabasePool {
    pool: PgPool,
    contributors: Arc<ContributorRepository>,
    views: Arc<ContentViewRepository>,
}

impl DatabasePool {
    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.postgres_url)
            .await?;

        info!(max_connections = config.max_connections, "Connected to PostgreSQL");

        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        let contributors = Arc::new(ContributorRepository::new(pool.clone()));
        let views = Arc::new(ContentViewRepository::new(pool.clone()));

        Self {
            pool,
            contributors,
            views,
        }
    }

    pub async fn init_schema(&self) -> StoreResult<()> {
        info!("Initializing database schema...");

        self.contributors.init_schema().await?;
        self.views.init_schema().await?;

        info!("Database schema initialized");
        Ok(())
    }

    pub fn contributors(&self) -> Arc<ContributorRepository> {
        self.contributors.clone()
    }

    pub fn views(&self) -> Arc<ContentViewRepository> {
        self.views.clone()
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
