#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::channel::oneshot;
use sqlx::SqlitePool;
use together_lib::{AppError, AppResult, Query, RecordStore, Row, SqliteStore};

pub async fn temp_pool() -> SqlitePool {
    let pool = together_lib::db::open_memory_pool()
        .await
        .expect("connect sqlite::memory:");
    together_lib::migrate::apply_migrations(&pool)
        .await
        .expect("apply migrations");
    pool
}

pub async fn temp_store() -> Arc<SqliteStore> {
    Arc::new(SqliteStore::new(temp_pool().await))
}

/// Delegates to `inner` until told to fail; then every call errors.
pub struct Flaky {
    inner: Arc<dyn RecordStore>,
    failing: AtomicBool,
}

impl Flaky {
    pub fn new(inner: Arc<dyn RecordStore>) -> Arc<Self> {
        Arc::new(Flaky {
            inner,
            failing: AtomicBool::new(false),
        })
    }

    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn heal(&self) {
        self.failing.store(false, Ordering::SeqCst);
    }

    fn check(&self) -> AppResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(AppError::new("STORE/UNAVAILABLE", "connection refused"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RecordStore for Flaky {
    async fn select(&self, table: &str, query: &Query) -> AppResult<Vec<Row>> {
        self.check()?;
        self.inner.select(table, query).await
    }

    async fn insert(&self, table: &str, row: Row) -> AppResult<Row> {
        self.check()?;
        self.inner.insert(table, row).await
    }

    async fn update(&self, table: &str, id: &str, changes: Row) -> AppResult<Row> {
        self.check()?;
        self.inner.update(table, id, changes).await
    }

    async fn delete(&self, table: &str, id: &str) -> AppResult<()> {
        self.check()?;
        self.inner.delete(table, id).await
    }
}

type Reply = AppResult<Vec<Row>>;

/// Answers each `select` with whatever the test sends on the matching
/// channel, in call order. Writes are refused.
#[derive(Default)]
pub struct Scripted {
    pending: Mutex<VecDeque<oneshot::Receiver<Reply>>>,
}

impl Scripted {
    pub fn new() -> Arc<Self> {
        Arc::new(Scripted::default())
    }

    /// Queues the reply channel for the next `select`.
    pub fn expect(&self) -> oneshot::Sender<Reply> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().push_back(rx);
        tx
    }
}

#[async_trait]
impl RecordStore for Scripted {
    async fn select(&self, _table: &str, _query: &Query) -> AppResult<Vec<Row>> {
        let rx = self.pending.lock().unwrap().pop_front();
        match rx {
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| Err(AppError::new("TEST/DROPPED", "reply dropped"))),
            None => Err(AppError::new("TEST/UNSCRIPTED", "no reply queued")),
        }
    }

    async fn insert(&self, _table: &str, _row: Row) -> AppResult<Row> {
        Err(AppError::new("TEST/READ_ONLY", "scripted store"))
    }

    async fn update(&self, _table: &str, _id: &str, _changes: Row) -> AppResult<Row> {
        Err(AppError::new("TEST/READ_ONLY", "scripted store"))
    }

    async fn delete(&self, _table: &str, _id: &str) -> AppResult<()> {
        Err(AppError::new("TEST/READ_ONLY", "scripted store"))
    }
}
