use crate::errors::StoreError;
use crate::schema::apply_schema;
use sqlx::any::{AnyPoolOptions, install_default_drivers};
use sqlx::AnyPool;
use tracing::{info, instrument};

/// Thin wrapper around a `sqlx::AnyPool`, so the rest of the workspace talks
/// to "the store" without caring whether `DATABASE_URL` points at Postgres
/// or SQLite (spec §6's `DATABASE_TYPE` switch).
#[derive(Clone)]
pub struct StoreClient {
    pool: AnyPool,
}

impl StoreClient {
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        if database_url.is_empty() {
            return Err(StoreError::Connection("DATABASE_URL is empty".into()));
        }

        install_default_drivers();

        let pool = AnyPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        apply_schema(&pool).await?;

        info!("store connected");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }
}
