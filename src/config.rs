//! Runtime settings read from the environment (and `.env`, loaded in `main`).

use std::path::PathBuf;

pub const DEFAULT_DB_PATH: &str = "airdata.sqlite3";
pub const DEFAULT_OUTPUT_DIR: &str = "output";
pub const DEFAULT_S3_PREFIX: &str = "reports";
pub const DEFAULT_LOG_FILE: &str = "logs/airdata.log";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// SQLite workspace file (`AIRDATA_DB`).
    pub db_path: PathBuf,
    /// Directory for exported reports and the load log (`AIRDATA_OUTPUT_DIR`).
    pub output_dir: PathBuf,
    /// Key prefix for S3 uploads (`AIRDATA_S3_PREFIX`).
    pub s3_prefix: String,
    /// Rolling JSON log file (`LOG_FILE_PATH`).
    pub log_file_path: PathBuf,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from any key lookup; unset or blank keys use defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Settings {
            db_path: PathBuf::from(get("AIRDATA_DB", DEFAULT_DB_PATH)),
            output_dir: PathBuf::from(get("AIRDATA_OUTPUT_DIR", DEFAULT_OUTPUT_DIR)),
            s3_prefix: get("AIRDATA_S3_PREFIX", DEFAULT_S3_PREFIX),
            log_file_path: PathBuf::from(get("LOG_FILE_PATH", DEFAULT_LOG_FILE)),
        }
    }

    /// Applies command-line overrides.
    pub fn with_overrides(mut self, db: Option<PathBuf>, output_dir: Option<PathBuf>) -> Self {
        if let Some(db) = db {
            self.db_path = db;
        }
        if let Some(dir) = output_dir {
            self.output_dir = dir;
        }
        self
    }

    pub fn load_log_path(&self) -> PathBuf {
        self.output_dir.join("load_log.csv")
    }
}
