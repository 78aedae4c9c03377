//! Shared goals, memories, finances and plans for two partners, kept in one
//! local SQLite database.

pub mod blob;
pub mod config;
pub mod db;
pub mod error;
pub mod hook;
pub mod id;
pub mod logging;
pub mod migrate;
pub mod model;
pub mod notify;
pub mod pages;
pub mod repo;
pub mod schema;
pub mod session;
pub mod state;
pub mod store;
pub mod time;

pub use error::{AppError, AppResult};
pub use hook::{DomainHook, ListOutcome};
pub use model::Entity;
pub use notify::{Notice, NoticeKind, Notifier, RecordingNotifier, TracingNotifier};
pub use repo::SqliteStore;
pub use schema::Row;
pub use store::{Query, RecordStore};
