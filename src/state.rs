use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::SqlitePool;

use crate::blob::{BlobStore, FsBlobStore};
use crate::config::Config;
use crate::notify::Notifier;
use crate::repo::SqliteStore;
use crate::store::RecordStore;
use crate::{db, migrate};

/// Everything a page needs, opened once per process.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub store: Arc<dyn RecordStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub notifier: Arc<dyn Notifier>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Opens the database at the configured path and brings it up to date.
    pub async fn open(config: Config, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let pool = db::open_sqlite_pool(&config.db_path).await?;
        migrate::apply_migrations(&pool)
            .await
            .context("apply migrations")?;
        Ok(Self::with_pool(pool, config, notifier))
    }

    pub fn with_pool(pool: SqlitePool, config: Config, notifier: Arc<dyn Notifier>) -> Self {
        AppState {
            store: Arc::new(SqliteStore::new(pool.clone())),
            blobs: Arc::new(FsBlobStore::new(config.blob_root.clone())),
            pool,
            notifier,
            config: Arc::new(config),
        }
    }
}
