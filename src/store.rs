use async_trait::async_trait;
use serde_json::Value;

use crate::schema::{Row, SortKey};
use crate::AppResult;

pub const STORE_NOT_FOUND: &str = "STORE/NOT_FOUND";
pub const STORE_UNKNOWN_TABLE: &str = "STORE/UNKNOWN_TABLE";
pub const STORE_UNKNOWN_COLUMN: &str = "STORE/UNKNOWN_COLUMN";
pub const STORE_UNAVAILABLE: &str = "STORE/UNAVAILABLE";

/// Ordering and equality filters for a table read.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub order: SortKey,
    pub filters: Vec<(String, Value)>,
}

impl Query {
    pub fn ordered(order: SortKey) -> Self {
        Query {
            order,
            filters: Vec::new(),
        }
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((column.into(), value.into()));
        self
    }
}

/// Table-oriented persistence shared by every domain hook. The store owns
/// identity and timestamps: it assigns them on insert and returns the row as
/// persisted from every write.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn select(&self, table: &str, query: &Query) -> AppResult<Vec<Row>>;

    async fn insert(&self, table: &str, row: Row) -> AppResult<Row>;

    /// Fails with [`STORE_NOT_FOUND`] when no row has `id`.
    async fn update(&self, table: &str, id: &str, changes: Row) -> AppResult<Row>;

    /// Fails with [`STORE_NOT_FOUND`] when no row has `id`.
    async fn delete(&self, table: &str, id: &str) -> AppResult<()>;
}
