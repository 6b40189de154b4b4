//! SQLite message store: persistence and range queries for chat messages.
//!
//! Uses SqlitePoolManager and the migration list; callers go through the
//! [`MessageStore`] trait (append / read_range / delete_range).

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use crate::error::StorageError;
use crate::lifecycle::{Lifecycle, StoreState};
use crate::migration::{self, Migration, MIGRATIONS};
use crate::models::{format_line, ChatMessage, ThreadScope, Transcript};
use crate::repository::{check_limit, MessageStore};
use crate::sqlite_pool::{SqlitePoolManager, StoreConfig};

/// Row shape read back for transcripts.
#[derive(sqlx::FromRow)]
struct StoredMessage {
    seq: i64,
    username: String,
    text: String,
    timestamp: i64,
}

/// SQLite-backed [`MessageStore`] with `(chat_id, message_id)` dedup.
///
/// Cloning is cheap and clones share one pool and one lifecycle. Operations
/// hold a shared lock for their whole duration and `close` takes it
/// exclusively, so closing waits for in-flight work and nothing runs on a
/// closed pool.
#[derive(Clone)]
pub struct SqliteMessageStore {
    config: StoreConfig,
    migrations: &'static [Migration],
    state: Arc<RwLock<Lifecycle<SqlitePoolManager>>>,
}

impl SqliteMessageStore {
    /// Creates an uninitialized store; call [`SqliteMessageStore::init`] before use.
    pub fn new(config: StoreConfig) -> Self {
        Self::with_migrations(config, MIGRATIONS)
    }

    /// Like [`SqliteMessageStore::new`] with an explicit migration list.
    pub fn with_migrations(config: StoreConfig, migrations: &'static [Migration]) -> Self {
        Self {
            config,
            migrations,
            state: Arc::new(RwLock::new(Lifecycle::Uninitialized)),
        }
    }

    /// Creates and initializes a store in one step.
    pub async fn open(config: StoreConfig) -> Result<Self, StorageError> {
        let store = Self::new(config);
        store.init().await?;
        Ok(store)
    }

    /// Opens the pool and brings the schema up to date. Runs once per store.
    #[instrument(skip(self), fields(database_url = %self.config.database_url))]
    pub async fn init(&self) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        state.ensure_uninitialized()?;

        let pool_manager = SqlitePoolManager::new(&self.config).await?;
        if let Err(e) = migration::run_migrations(pool_manager.pool(), self.migrations).await {
            pool_manager.close().await;
            return Err(e);
        }

        *state = Lifecycle::Ready(pool_manager);
        info!("Message store ready");
        Ok(())
    }

    /// Persisted schema version.
    pub async fn schema_version(&self) -> Result<i64, StorageError> {
        let state = self.state.read().await;
        let pool = state.ready()?.pool();
        Ok(migration::schema_version(pool).await?)
    }
}

#[async_trait]
impl MessageStore for SqliteMessageStore {
    #[instrument(skip(self, message), fields(chat_id = message.chat_id, message_id = message.message_id))]
    async fn append(&self, message: &ChatMessage) -> Result<(), StorageError> {
        message.validate()?;

        let state = self.state.read().await;
        let pool = state.ready()?.pool();

        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO messages (chat_id, message_id, thread_id, user_id, username, text, timestamp)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(message.chat_id)
        .bind(message.message_id)
        .bind(message.thread.thread_id())
        .bind(message.user_id)
        .bind(&message.username)
        .bind(&message.text)
        .bind(message.timestamp)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            debug!(thread = %message.thread, "Duplicate message ignored");
        } else {
            debug!(thread = %message.thread, "Saved message");
        }
        Ok(())
    }

    #[instrument(skip(self), fields(thread = %thread))]
    async fn read_range(
        &self,
        chat_id: i64,
        thread: ThreadScope,
        limit: Option<u32>,
    ) -> Result<Option<Transcript>, StorageError> {
        let limit = check_limit(limit)?;

        let state = self.state.read().await;
        let pool = state.ready()?.pool();

        // Newest first so LIMIT keeps the most recent rows; reversed below.
        let mut rows: Vec<StoredMessage> = sqlx::query_as(
            r#"
            SELECT seq, username, text, timestamp FROM messages
            WHERE chat_id = ? AND thread_id IS ?
            ORDER BY timestamp DESC, seq DESC
            LIMIT ?
            "#,
        )
        .bind(chat_id)
        .bind(thread.thread_id())
        .bind(limit.map(i64::from).unwrap_or(-1))
        .fetch_all(pool)
        .await?;

        rows.reverse();
        info!(chat_id, count = rows.len(), "Retrieved messages");

        Ok(Transcript::from_lines(rows.into_iter().map(|row| {
            (
                row.seq,
                format_line(row.timestamp, &row.username, &row.text),
            )
        })))
    }

    #[instrument(skip(self), fields(thread = %thread))]
    async fn delete_range(&self, chat_id: i64, thread: ThreadScope) -> Result<(), StorageError> {
        let state = self.state.read().await;
        let pool = state.ready()?.pool();

        let result = sqlx::query("DELETE FROM messages WHERE chat_id = ? AND thread_id IS ?")
            .bind(chat_id)
            .bind(thread.thread_id())
            .execute(pool)
            .await?;

        info!(chat_id, deleted = result.rows_affected(), "Deleted partition");
        Ok(())
    }

    #[instrument(skip(self), fields(thread = %thread))]
    async fn delete_through(
        &self,
        chat_id: i64,
        thread: ThreadScope,
        watermark: i64,
    ) -> Result<(), StorageError> {
        let state = self.state.read().await;
        let pool = state.ready()?.pool();

        let result = sqlx::query(
            "DELETE FROM messages WHERE chat_id = ? AND thread_id IS ? AND seq <= ?",
        )
        .bind(chat_id)
        .bind(thread.thread_id())
        .bind(watermark)
        .execute(pool)
        .await?;

        info!(
            chat_id,
            watermark,
            deleted = result.rows_affected(),
            "Deleted partition through watermark"
        );
        Ok(())
    }

    async fn count(&self, chat_id: i64, thread: ThreadScope) -> Result<u64, StorageError> {
        let state = self.state.read().await;
        let pool = state.ready()?.pool();

        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM messages WHERE chat_id = ? AND thread_id IS ?")
                .bind(chat_id)
                .bind(thread.thread_id())
                .fetch_one(pool)
                .await?;

        Ok(count as u64)
    }

    async fn close(&self) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        match state.close() {
            Some(pool_manager) => {
                pool_manager.close().await;
                info!("Message store closed");
            }
            None => debug!("Message store was not open; nothing to release"),
        }
        Ok(())
    }

    async fn state(&self) -> StoreState {
        self.state.read().await.state()
    }
}
