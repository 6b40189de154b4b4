//! Unit tests for SqliteMessageStore.
//!
//! Covers lifecycle faults, concurrent duplicate delivery, watermark purges
//! and reopening an on-disk database.

use std::sync::Arc;

use crate::error::StorageError;
use crate::lifecycle::StoreState;
use crate::message_repo::SqliteMessageStore;
use crate::models::{ChatMessage, ThreadScope};
use crate::repository::MessageStore;
use crate::sqlite_pool::StoreConfig;

fn msg(message_id: i64, text: &str, timestamp: i64) -> ChatMessage {
    ChatMessage::new(-100, message_id, 42, "alice", text, timestamp)
}

async fn memory_store() -> SqliteMessageStore {
    SqliteMessageStore::open(StoreConfig::in_memory())
        .await
        .expect("Failed to open store")
}

#[tokio::test]
async fn test_operations_before_init_fail() {
    let store = SqliteMessageStore::new(StoreConfig::in_memory());
    assert_eq!(store.state().await, StoreState::Uninitialized);

    let err = store.append(&msg(1, "hi", 1_700_000_000)).await.unwrap_err();
    assert!(matches!(err, StorageError::NotInitialized));
    assert!(err.is_lifecycle());

    let err = store
        .read_range(-100, ThreadScope::Root, None)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotInitialized));

    let err = store
        .delete_range(-100, ThreadScope::Root)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotInitialized));
}

#[tokio::test]
async fn test_operations_after_close_fail() {
    let store = memory_store().await;
    store.append(&msg(1, "hi", 1_700_000_000)).await.unwrap();

    store.close().await.unwrap();
    assert_eq!(store.state().await, StoreState::Closed);

    let err = store.append(&msg(2, "late", 1_700_000_001)).await.unwrap_err();
    assert!(matches!(err, StorageError::Closed));
    let err = store
        .read_range(-100, ThreadScope::Root, None)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Closed));
    let err = store.count(-100, ThreadScope::Root).await.unwrap_err();
    assert!(err.is_lifecycle());

    // A second close is harmless; re-initializing a closed store is not allowed.
    assert!(store.close().await.is_ok());
    assert!(matches!(store.init().await, Err(StorageError::Closed)));
}

#[tokio::test]
async fn test_double_init_is_rejected() {
    let store = memory_store().await;
    assert!(matches!(
        store.init().await,
        Err(StorageError::AlreadyInitialized)
    ));
    assert_eq!(store.state().await, StoreState::Ready);
}

#[tokio::test]
async fn test_clones_share_lifecycle() {
    let store = memory_store().await;
    let clone = store.clone();

    clone.append(&msg(1, "from clone", 1_700_000_000)).await.unwrap();
    assert_eq!(store.count(-100, ThreadScope::Root).await.unwrap(), 1);

    store.close().await.unwrap();
    assert_eq!(clone.state().await, StoreState::Closed);
}

#[tokio::test]
async fn test_invalid_message_is_rejected_before_write() {
    let store = memory_store().await;

    let err = store.append(&msg(1, "", 1_700_000_000)).await.unwrap_err();
    assert!(matches!(err, StorageError::InvalidMessage(_)));
    assert_eq!(store.count(-100, ThreadScope::Root).await.unwrap(), 0);
}

#[tokio::test]
async fn test_zero_limit_is_rejected() {
    let store = memory_store().await;
    store.append(&msg(1, "hi", 1_700_000_000)).await.unwrap();

    let err = store
        .read_range(-100, ThreadScope::Root, Some(0))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::InvalidQuery(_)));
}

#[tokio::test]
async fn test_equal_timestamps_keep_insertion_order() {
    let store = memory_store().await;
    store.append(&msg(1, "alpha", 1_700_000_000)).await.unwrap();
    store.append(&msg(2, "beta", 1_700_000_000)).await.unwrap();
    store.append(&msg(3, "gamma", 1_700_000_000)).await.unwrap();

    let transcript = store
        .read_range(-100, ThreadScope::Root, None)
        .await
        .unwrap()
        .unwrap();
    let alpha = transcript.content.find("alpha").unwrap();
    let beta = transcript.content.find("beta").unwrap();
    let gamma = transcript.content.find("gamma").unwrap();
    assert!(alpha < beta && beta < gamma);

    let last_two = store
        .read_range(-100, ThreadScope::Root, Some(2))
        .await
        .unwrap()
        .unwrap();
    assert!(!last_two.content.contains("alpha"));
    assert!(last_two.content.find("beta").unwrap() < last_two.content.find("gamma").unwrap());
}

#[tokio::test]
async fn test_delete_through_keeps_messages_appended_after_read() {
    let store = memory_store().await;
    store.append(&msg(1, "before one", 1_700_000_001)).await.unwrap();
    store.append(&msg(2, "before two", 1_700_000_002)).await.unwrap();

    let transcript = store
        .read_range(-100, ThreadScope::Root, None)
        .await
        .unwrap()
        .unwrap();

    store.append(&msg(3, "during summary", 1_700_000_003)).await.unwrap();
    store
        .delete_through(-100, ThreadScope::Root, transcript.watermark)
        .await
        .unwrap();

    let remaining = store
        .read_range(-100, ThreadScope::Root, None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(remaining.message_count, 1);
    assert!(remaining.content.contains("during summary"));
}

#[tokio::test]
async fn test_delete_through_with_limit_purges_older_rows() {
    let store = memory_store().await;
    for i in 1..=4 {
        store
            .append(&msg(i, &format!("msg {}", i), 1_700_000_000 + i))
            .await
            .unwrap();
    }

    let transcript = store
        .read_range(-100, ThreadScope::Root, Some(2))
        .await
        .unwrap()
        .unwrap();
    store
        .delete_through(-100, ThreadScope::Root, transcript.watermark)
        .await
        .unwrap();

    // The watermark is an insertion sequence, so everything stored up to the
    // newest row read is purged, including older rows outside the limit.
    assert_eq!(store.count(-100, ThreadScope::Root).await.unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_duplicate_appends_store_one_row() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("dup.db").display());
    let store = Arc::new(SqliteMessageStore::open(StoreConfig::new(url)).await.unwrap());

    let mut handles = Vec::new();
    for i in 0..16 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            let text = if i == 0 { "first" } else { "retry" };
            store.append(&msg(1, text, 1_700_000_000)).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().expect("duplicate append must not fail");
    }

    assert_eq!(store.count(-100, ThreadScope::Root).await.unwrap(), 1);
    store.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_appends_across_partitions() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("many.db").display());
    let store = SqliteMessageStore::open(StoreConfig::new(url)).await.unwrap();

    let mut handles = Vec::new();
    for thread in 1..=4_i64 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..10_i64 {
                let message = ChatMessage::new(-100, thread * 100 + i, 42, "alice", "hi", 1_700_000_000 + i)
                    .in_thread(thread);
                store.append(&message).await?;
            }
            Ok::<_, StorageError>(())
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    for thread in 1..=4_i64 {
        assert_eq!(
            store.count(-100, ThreadScope::Topic(thread)).await.unwrap(),
            10
        );
    }
    assert_eq!(store.count(-100, ThreadScope::Root).await.unwrap(), 0);
    store.close().await.unwrap();
}

#[tokio::test]
async fn test_reopen_keeps_messages_and_schema_version() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("reopen.db").display());

    let store = SqliteMessageStore::open(StoreConfig::new(url.clone())).await.unwrap();
    store.append(&msg(1, "persisted", 1_700_000_000)).await.unwrap();
    store.close().await.unwrap();

    let reopened = SqliteMessageStore::open(StoreConfig::new(url)).await.unwrap();
    assert_eq!(reopened.schema_version().await.unwrap(), 1);

    // Same identity after restart is still a duplicate.
    reopened.append(&msg(1, "replayed", 1_700_000_005)).await.unwrap();
    let transcript = reopened
        .read_range(-100, ThreadScope::Root, None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(transcript.message_count, 1);
    assert!(transcript.content.contains("persisted"));
    reopened.close().await.unwrap();
}
