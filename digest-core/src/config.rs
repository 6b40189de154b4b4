//! Digest configuration: store backend, database, logging and summary defaults. Loaded from env.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use storage::StoreConfig;

use crate::error::{DigestError, Result};

/// Which [`storage::MessageStore`] implementation to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Indexed SQLite table with message-identity dedup.
    Sqlite,
    /// One append-only file per partition; no dedup.
    File,
}

impl FromStr for StoreBackend {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(StoreBackend::Sqlite),
            "file" => Ok(StoreBackend::File),
            other => Err(DigestError::Config(format!(
                "STORE_BACKEND must be 'sqlite' or 'file', got '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DigestConfig {
    /// STORE_BACKEND
    pub backend: StoreBackend,
    /// DATABASE_URL, DATABASE_MAX_CONNECTIONS, DATABASE_BUSY_TIMEOUT_SECS
    pub store: StoreConfig,
    /// MESSAGE_LOG_DIR (file backend only)
    pub message_log_dir: PathBuf,
    /// LOG_FILE
    pub log_file: String,
    /// SUMMARY_DEFAULT_LIMIT; `None` summarizes the whole partition
    pub summary_default_limit: Option<u32>,
}

impl DigestConfig {
    /// Load from environment variables, falling back to defaults for anything unset.
    pub fn load() -> Result<Self> {
        let backend = match env::var("STORE_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => StoreBackend::Sqlite,
        };

        let defaults = StoreConfig::default();
        let store = StoreConfig::new(env::var("DATABASE_URL").unwrap_or(defaults.database_url))
            .with_max_connections(
                parse_var("DATABASE_MAX_CONNECTIONS")?.unwrap_or(defaults.max_connections),
            )
            .with_busy_timeout(
                parse_var("DATABASE_BUSY_TIMEOUT_SECS")?
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.busy_timeout),
            );

        let message_log_dir = env::var("MESSAGE_LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./messages"));
        let log_file = env::var("LOG_FILE").unwrap_or_else(|_| "logs/digest.log".to_string());
        let summary_default_limit = parse_var("SUMMARY_DEFAULT_LIMIT")?;

        Ok(Self {
            backend,
            store,
            message_log_dir,
            log_file,
            summary_default_limit,
        })
    }

    /// Validate config (positive pool size and limit, non-empty paths).
    pub fn validate(&self) -> Result<()> {
        if self.store.max_connections == 0 {
            return Err(DigestError::Config(
                "DATABASE_MAX_CONNECTIONS must be at least 1".to_string(),
            ));
        }
        if self.summary_default_limit == Some(0) {
            return Err(DigestError::Config(
                "SUMMARY_DEFAULT_LIMIT must be a positive integer".to_string(),
            ));
        }
        if self.backend == StoreBackend::Sqlite && self.store.database_url.trim().is_empty() {
            return Err(DigestError::Config("DATABASE_URL is empty".to_string()));
        }
        if self.backend == StoreBackend::File && self.message_log_dir.as_os_str().is_empty() {
            return Err(DigestError::Config("MESSAGE_LOG_DIR is empty".to_string()));
        }
        Ok(())
    }
}

/// Parses an optional numeric env var; set-but-unparsable is an error.
fn parse_var<T: FromStr>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| DigestError::Config(format!("{} is not a valid number: {}", name, raw))),
        Err(_) => Ok(None),
    }
}
