use std::collections::HashMap;
use std::fmt;
use std::io::Error as IoError;

use serde::{Deserialize, Serialize};
use sqlx::Error as SqlxError;

use crate::store::{STORE_NOT_FOUND, STORE_UNAVAILABLE};

/// Error carried by every store, schema and blob operation.
///
/// `code` is a `AREA/REASON` pair (`STORE/NOT_FOUND`, `SCHEMA/DECODE`, ...)
/// that logs and tests match on; `message` is for people.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppError {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<Box<AppError>>,
}

pub type AppResult<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        AppError {
            code: code.into(),
            message: message.into(),
            context: HashMap::new(),
            cause: None,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn context(&self) -> &HashMap<String, String> {
        &self.context
    }

    pub fn cause(&self) -> Option<&AppError> {
        self.cause.as_deref()
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Tags the error with the table it concerns.
    pub fn in_table(self, table: &str) -> Self {
        self.with_context("table", table)
    }

    pub fn with_cause(mut self, cause: AppError) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// True when no row matched the requested id.
    pub fn is_not_found(&self) -> bool {
        self.code == STORE_NOT_FOUND
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if !self.context.is_empty() {
            let mut pairs: Vec<_> = self.context.iter().collect();
            pairs.sort();
            let joined: Vec<String> = pairs.iter().map(|(k, v)| format!("{k}={v}")).collect();
            write!(f, " ({})", joined.join(", "))?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}

impl From<IoError> for AppError {
    fn from(error: IoError) -> Self {
        let mut app_error = AppError::new(format!("IO/{:?}", error.kind()), error.to_string());
        if let Some(os_code) = error.raw_os_error() {
            app_error = app_error.with_context("os_code", os_code.to_string());
        }
        app_error
    }
}

impl From<SqlxError> for AppError {
    fn from(error: SqlxError) -> Self {
        match error {
            SqlxError::RowNotFound => AppError::new(STORE_NOT_FOUND, "Record not found"),
            SqlxError::PoolTimedOut | SqlxError::PoolClosed => {
                AppError::new(STORE_UNAVAILABLE, error.to_string())
            }
            SqlxError::Io(err) => AppError::new(STORE_UNAVAILABLE, "Database I/O failed")
                .with_cause(AppError::from(err)),
            SqlxError::Database(db) => {
                let code = match db.code() {
                    Some(code) => format!("SQLX/{code}"),
                    None => "SQLX/DATABASE".to_string(),
                };
                let app_error = AppError::new(code, db.message().to_string());
                match db.constraint() {
                    Some(constraint) => app_error.with_context("constraint", constraint.to_string()),
                    None => app_error,
                }
            }
            SqlxError::ColumnDecode { index, source } => {
                AppError::new("SQLX/DECODE", source.to_string()).with_context("column", index.to_string())
            }
            SqlxError::Decode(source) => AppError::new("SQLX/DECODE", source.to_string()),
            other => AppError::new("SQLX/ERROR", other.to_string()),
        }
    }
}
