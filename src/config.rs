use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;

use crate::session::{Passcode, DEFAULT_PASSCODE};
use crate::time::parse_date;

pub const ENV_DB: &str = "TOGETHER_DB";
pub const ENV_BLOBS: &str = "TOGETHER_BLOBS";
pub const ENV_PASSCODE: &str = "TOGETHER_PASSCODE";
pub const ENV_SINCE: &str = "TOGETHER_SINCE";

const APP_DIR: &str = "together";
const DB_FILE: &str = "together.sqlite3";
const PHOTO_DIR: &str = "photos";
pub const DEFAULT_SINCE: &str = "2025-08-08";

/// Values given explicitly on the command line; they beat the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub db_path: Option<PathBuf>,
    pub blob_root: Option<PathBuf>,
    pub passcode: Option<String>,
    pub together_since: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub blob_root: PathBuf,
    pub passcode: Passcode,
    pub together_since: NaiveDate,
}

impl Config {
    /// Resolves every setting from `overrides`, then the process environment,
    /// then the defaults.
    pub fn resolve(overrides: Overrides) -> Result<Self> {
        Self::resolve_with(overrides, |key| std::env::var(key).ok())
    }

    pub fn resolve_with<F>(overrides: Overrides, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |explicit: Option<String>, key: &str| {
            explicit.or_else(|| env(key).filter(|v| !v.trim().is_empty()))
        };

        let db_path = match pick(path_string(overrides.db_path), ENV_DB) {
            Some(path) => PathBuf::from(path),
            None => data_dir()?.join(DB_FILE),
        };
        let blob_root = match pick(path_string(overrides.blob_root), ENV_BLOBS) {
            Some(path) => PathBuf::from(path),
            None => data_dir()?.join(PHOTO_DIR),
        };

        let passcode = pick(overrides.passcode, ENV_PASSCODE)
            .unwrap_or_else(|| DEFAULT_PASSCODE.to_string());
        let passcode = Passcode::new(passcode).context("invalid passcode setting")?;

        let since = pick(overrides.together_since, ENV_SINCE)
            .unwrap_or_else(|| DEFAULT_SINCE.to_string());
        let together_since =
            parse_date(&since).ok_or_else(|| anyhow!("invalid start date {since:?}, expected YYYY-MM-DD"))?;

        tracing::debug!(
            target: "together",
            event = "config_resolved",
            db_path = %db_path.display(),
            blob_root = %blob_root.display(),
            together_since = %together_since
        );

        Ok(Config {
            db_path,
            blob_root,
            passcode,
            together_since,
        })
    }
}

fn path_string(path: Option<PathBuf>) -> Option<String> {
    path.map(|p| p.to_string_lossy().into_owned())
}

fn data_dir() -> Result<PathBuf> {
    let base = dirs::data_dir()
        .or_else(|| std::env::current_dir().ok())
        .ok_or_else(|| anyhow!("failed to resolve application data directory"))?;
    Ok(base.join(APP_DIR))
}
