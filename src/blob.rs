//! Photo storage: a flat directory of uploaded files addressed by name.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use mime_guess::MimeGuess;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::time::now_ms;
use crate::{AppError, AppResult};

pub const BLOB_INVALID_NAME: &str = "BLOB/INVALID_NAME";
pub const BLOB_NOT_FOUND: &str = "BLOB/NOT_FOUND";
pub const BLOB_EXISTS: &str = "BLOB/EXISTS";

const MAX_NAME_LEN: usize = 200;

static BLOB_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("blob name pattern to compile")
});

static EXTENSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9]{1,10}$").expect("extension pattern to compile"));

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BlobPathError {
    #[error("blob name is empty")]
    Empty,
    #[error("blob name is longer than {MAX_NAME_LEN} characters")]
    TooLong,
    #[error("blob name {0:?} would leave the photo directory")]
    Escapes(String),
    #[error("blob name {0:?} contains unsupported characters")]
    Invalid(String),
}

impl From<BlobPathError> for AppError {
    fn from(err: BlobPathError) -> Self {
        let name = match &err {
            BlobPathError::Escapes(name) | BlobPathError::Invalid(name) => name.clone(),
            BlobPathError::Empty | BlobPathError::TooLong => String::new(),
        };
        AppError::new(BLOB_INVALID_NAME, err.to_string()).with_context("name", name)
    }
}

/// Checks that `name` is a single plain file name inside the store root.
pub fn validate_name(name: &str) -> Result<&str, BlobPathError> {
    if name.is_empty() {
        return Err(BlobPathError::Empty);
    }
    if name.len() > MAX_NAME_LEN {
        return Err(BlobPathError::TooLong);
    }
    if name.contains("..") || name.contains('/') || name.contains('\\') {
        return Err(BlobPathError::Escapes(name.to_string()));
    }
    if !BLOB_NAME.is_match(name) {
        return Err(BlobPathError::Invalid(name.to_string()));
    }
    Ok(name)
}

/// A stored file as reported by a listing or an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlobEntry {
    pub name: String,
    pub size: u64,
    /// Milliseconds since epoch.
    pub created_at: i64,
    pub content_type: String,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Every stored file, newest first.
    async fn list(&self) -> AppResult<Vec<BlobEntry>>;

    /// Stores `bytes` under a generated name that keeps the extension of
    /// `original_name`. Never overwrites.
    async fn upload(&self, original_name: &str, bytes: &[u8]) -> AppResult<BlobEntry>;

    fn public_url(&self, name: &str) -> AppResult<String>;

    async fn remove(&self, name: &str) -> AppResult<()>;
}

/// Builds `<ms>-<uuid>.<ext>`; the extension is dropped when it is unusable.
pub fn generated_name(original_name: &str, stamp_ms: i64) -> String {
    let unique = uuid::Uuid::new_v4().simple().to_string();
    let ext = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| EXTENSION.is_match(e))
        .map(str::to_ascii_lowercase);
    match ext {
        Some(ext) => format!("{stamp_ms}-{unique}.{ext}"),
        None => format!("{stamp_ms}-{unique}"),
    }
}

fn content_type(name: &str) -> String {
    MimeGuess::from_path(name)
        .first()
        .map(|m| m.essence_str().to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, name: &str) -> AppResult<PathBuf> {
        let name = validate_name(name)?;
        let full = self.root.join(name);
        if !full.starts_with(&self.root) {
            return Err(BlobPathError::Escapes(name.to_string()).into());
        }
        Ok(full)
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn list(&self) -> AppResult<Vec<BlobEntry>> {
        let mut dir = match tokio::fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AppError::from(e).with_context("operation", "blob_list")),
        };

        let mut entries = Vec::new();
        while let Some(item) = dir.next_entry().await? {
            let meta = item.metadata().await?;
            if !meta.is_file() {
                continue;
            }
            let name = item.file_name().to_string_lossy().into_owned();
            if validate_name(&name).is_err() {
                warn!(target: "together", event = "blob_list_skip", name = %name);
                continue;
            }
            let created_at = meta
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_millis() as i64)
                .unwrap_or_default();
            entries.push(BlobEntry {
                content_type: content_type(&name),
                name,
                size: meta.len(),
                created_at,
            });
        }
        entries.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.name.cmp(&a.name))
        });
        Ok(entries)
    }

    async fn upload(&self, original_name: &str, bytes: &[u8]) -> AppResult<BlobEntry> {
        tokio::fs::create_dir_all(&self.root).await?;
        let created_at = now_ms();
        let name = generated_name(original_name, created_at);
        let path = self.resolve(&name)?;

        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(AppError::new(BLOB_EXISTS, "A photo with that name already exists")
                    .with_context("name", name))
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(bytes).await?;
        file.sync_all().await?;

        info!(target: "together", event = "blob_uploaded", name = %name, size = bytes.len());
        Ok(BlobEntry {
            content_type: content_type(&name),
            name,
            size: bytes.len() as u64,
            created_at,
        })
    }

    fn public_url(&self, name: &str) -> AppResult<String> {
        let path = self.resolve(name)?;
        Ok(format!("file://{}", path.display()))
    }

    async fn remove(&self, name: &str) -> AppResult<()> {
        let path = self.resolve(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!(target: "together", event = "blob_removed", name = %name);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(AppError::new(BLOB_NOT_FOUND, "Photo not found").with_context("name", name))
            }
            Err(e) => Err(e.into()),
        }
    }
}
