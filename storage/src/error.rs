//! Storage error types.
//!
//! Lifecycle faults, malformed input and backend failures are kept apart so
//! callers can tell a usage bug from a data or I/O problem.

use thiserror::Error;

/// Errors that can occur when using storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Store not initialized")]
    NotInitialized,

    #[error("Store already initialized")]
    AlreadyInitialized,

    #[error("Store is closed")]
    Closed,

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration to schema version {version} failed: {source}")]
    Migration {
        version: i64,
        #[source]
        source: sqlx::Error,
    },

    #[error("Schema version {found} is newer than the latest known version {supported}")]
    SchemaTooNew { found: i64, supported: i64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// True for errors caused by calling the store outside its `Ready` state.
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            StorageError::NotInitialized | StorageError::AlreadyInitialized | StorageError::Closed
        )
    }

    /// True for input rejected before any write was attempted.
    pub fn is_constraint(&self) -> bool {
        matches!(
            self,
            StorageError::InvalidMessage(_) | StorageError::InvalidQuery(_)
        )
    }
}
