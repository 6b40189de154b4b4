//! Storage crate: partitioned chat message persistence.
//!
//! ## Modules
//!
//! - [`error`] – Storage error types
//! - [`models`] – ChatMessage, ThreadScope, Transcript
//! - [`repository`] – MessageStore trait
//! - [`message_repo`] – SqliteMessageStore (deduplicating, indexed table)
//! - [`file_log`] – FileLogStore (append-only file per partition)
//! - [`migration`] – Versioned schema steps
//! - [`sqlite_pool`] – SqlitePoolManager, StoreConfig

mod error;
mod file_log;
mod lifecycle;
mod message_repo;
pub mod migration;
mod models;
mod repository;
mod sqlite_pool;

#[cfg(test)]
mod message_repo_test;

pub use error::StorageError;
pub use file_log::FileLogStore;
pub use lifecycle::StoreState;
pub use message_repo::SqliteMessageStore;
pub use migration::{Migration, MIGRATIONS};
pub use models::{format_line, format_timestamp, ChatMessage, ThreadScope, Transcript};
pub use repository::MessageStore;
pub use sqlite_pool::{SqlitePoolManager, StoreConfig};
