//! Opens the configured message store.

use std::sync::Arc;

use storage::{FileLogStore, MessageStore, SqliteMessageStore};
use tracing::{info, warn};

use crate::config::{DigestConfig, StoreBackend};
use crate::error::Result;

/// Opens and initializes the store selected by `config.backend`.
///
/// The SQLite store is migrated before it is returned, so the caller can
/// accept events right away.
pub async fn open_store(config: &DigestConfig) -> Result<Arc<dyn MessageStore>> {
    match config.backend {
        StoreBackend::Sqlite => {
            info!(database_url = %config.store.database_url, "Opening SQLite message store");
            let store = SqliteMessageStore::open(config.store.clone()).await?;
            Ok(Arc::new(store))
        }
        StoreBackend::File => {
            warn!(
                dir = %config.message_log_dir.display(),
                "Opening file log store; duplicate deliveries will not be detected"
            );
            let store = FileLogStore::open(config.message_log_dir.clone()).await?;
            Ok(Arc::new(store))
        }
    }
}
