use async_trait::async_trait;

use crate::error::StorageError;
use crate::lifecycle::StoreState;
use crate::models::{ChatMessage, ThreadScope, Transcript};

/// Partitioned, ordered message storage.
///
/// A partition is one `(chat_id, thread)` pair. Every operation other than
/// [`MessageStore::state`] fails with a lifecycle error unless the store is `Ready`.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Stores `message`. A repeated `(chat_id, message_id)` is silently ignored
    /// by backends that track message identity; the first write wins.
    async fn append(&self, message: &ChatMessage) -> Result<(), StorageError>;

    /// Reads the partition oldest-first. With `limit`, only the `limit` most
    /// recent messages are included. `None` when the partition is empty.
    async fn read_range(
        &self,
        chat_id: i64,
        thread: ThreadScope,
        limit: Option<u32>,
    ) -> Result<Option<Transcript>, StorageError>;

    /// Removes every message of the partition. Empty partitions are not an error.
    async fn delete_range(&self, chat_id: i64, thread: ThreadScope) -> Result<(), StorageError>;

    /// Removes the messages a previous read covered (sequence at or below
    /// `watermark`), keeping anything appended since.
    async fn delete_through(
        &self,
        chat_id: i64,
        thread: ThreadScope,
        watermark: i64,
    ) -> Result<(), StorageError>;

    /// Number of messages in the partition.
    async fn count(&self, chat_id: i64, thread: ThreadScope) -> Result<u64, StorageError>;

    /// Releases the backend. Later calls fail with [`StorageError::Closed`].
    async fn close(&self) -> Result<(), StorageError>;

    async fn state(&self) -> StoreState;
}

/// Rejects a zero limit; `None` means unbounded.
pub(crate) fn check_limit(limit: Option<u32>) -> Result<Option<u32>, StorageError> {
    match limit {
        Some(0) => Err(StorageError::InvalidQuery(
            "limit must be a positive integer".to_string(),
        )),
        other => Ok(other),
    }
}
