//! Versioned schema migrations.
//!
//! The applied version is kept in SQLite's `user_version` pragma. Each step
//! runs in its own transaction together with the version bump, so a step is
//! either fully applied and recorded or not applied at all.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::StorageError;

/// One schema step. Statements should be idempotent (`IF NOT EXISTS`).
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub description: &'static str,
    pub statements: &'static [&'static str],
}

/// All schema steps, oldest first. Step `i` moves the schema to version `i + 1`.
pub const MIGRATIONS: &[Migration] = &[Migration {
    description: "create messages table and partition index",
    statements: &[
        r#"
        CREATE TABLE IF NOT EXISTS messages (
            seq        INTEGER PRIMARY KEY AUTOINCREMENT,
            chat_id    INTEGER NOT NULL,
            message_id INTEGER NOT NULL,
            thread_id  INTEGER,
            user_id    INTEGER NOT NULL,
            username   TEXT    NOT NULL,
            text       TEXT    NOT NULL,
            timestamp  INTEGER NOT NULL,
            UNIQUE (chat_id, message_id)
        )
        "#,
        r#"
        CREATE INDEX IF NOT EXISTS idx_messages_chat_thread_ts
            ON messages (chat_id, thread_id, timestamp DESC)
        "#,
    ],
}];

/// Latest schema version known to this build.
pub fn latest_version(migrations: &[Migration]) -> i64 {
    migrations.len() as i64
}

/// Reads the persisted schema version (0 for a fresh database).
pub async fn schema_version(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    let (version,): (i64,) = sqlx::query_as("PRAGMA user_version")
        .fetch_one(pool)
        .await?;
    Ok(version)
}

/// Applies every step the database has not seen yet, in order.
///
/// Returns the number of steps applied. A database already on a newer
/// schema than `migrations` describes is refused.
pub async fn run_migrations(
    pool: &SqlitePool,
    migrations: &[Migration],
) -> Result<usize, StorageError> {
    let current = schema_version(pool).await?;
    let latest = latest_version(migrations);

    if current > latest {
        return Err(StorageError::SchemaTooNew {
            found: current,
            supported: latest,
        });
    }

    let mut applied = 0;
    for (index, migration) in migrations.iter().enumerate().skip(current as usize) {
        let version = index as i64 + 1;
        info!(version, description = migration.description, "Applying migration");

        apply(pool, migration, version)
            .await
            .map_err(|source| StorageError::Migration { version, source })?;
        applied += 1;
    }

    if applied == 0 {
        info!(version = current, "Schema up to date");
    } else {
        info!(version = latest, applied, "Schema migrated");
    }
    Ok(applied)
}

async fn apply(pool: &SqlitePool, migration: &Migration, version: i64) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for statement in migration.statements {
        sqlx::query(statement).execute(&mut *tx).await?;
    }
    // PRAGMA does not take bound parameters.
    sqlx::query(&format!("PRAGMA user_version = {}", version))
        .execute(&mut *tx)
        .await?;
    tx.commit().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite_pool::{SqlitePoolManager, StoreConfig};

    const WITH_AUDIT_COLUMN: &[Migration] = &[
        MIGRATIONS[0],
        Migration {
            description: "add received_at column",
            statements: &["ALTER TABLE messages ADD COLUMN received_at INTEGER"],
        },
    ];

    async fn memory_pool() -> SqlitePoolManager {
        SqlitePoolManager::new(&StoreConfig::in_memory())
            .await
            .expect("Failed to create pool")
    }

    #[tokio::test]
    async fn test_fresh_database_reaches_latest_version() {
        let manager = memory_pool().await;
        let pool = manager.pool();

        assert_eq!(schema_version(pool).await.unwrap(), 0);
        let applied = run_migrations(pool, MIGRATIONS).await.unwrap();

        assert_eq!(applied, MIGRATIONS.len());
        assert_eq!(schema_version(pool).await.unwrap(), latest_version(MIGRATIONS));
    }

    #[tokio::test]
    async fn test_migrations_never_rerun() {
        let manager = memory_pool().await;
        let pool = manager.pool();

        run_migrations(pool, MIGRATIONS).await.unwrap();
        let applied = run_migrations(pool, MIGRATIONS).await.unwrap();

        assert_eq!(applied, 0);
        assert_eq!(schema_version(pool).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_upgrade_runs_only_unseen_steps() {
        let manager = memory_pool().await;
        let pool = manager.pool();

        run_migrations(pool, MIGRATIONS).await.unwrap();
        // The ALTER TABLE is not idempotent; running it twice would fail.
        let applied = run_migrations(pool, WITH_AUDIT_COLUMN).await.unwrap();
        assert_eq!(applied, 1);
        assert_eq!(schema_version(pool).await.unwrap(), 2);

        let applied = run_migrations(pool, WITH_AUDIT_COLUMN).await.unwrap();
        assert_eq!(applied, 0);
    }

    #[tokio::test]
    async fn test_newer_schema_is_refused() {
        let manager = memory_pool().await;
        let pool = manager.pool();

        run_migrations(pool, WITH_AUDIT_COLUMN).await.unwrap();
        let err = run_migrations(pool, MIGRATIONS).await.unwrap_err();

        assert!(matches!(
            err,
            StorageError::SchemaTooNew {
                found: 2,
                supported: 1
            }
        ));
    }

    #[tokio::test]
    async fn test_failed_step_leaves_version_unchanged() {
        const BROKEN: &[Migration] = &[
            MIGRATIONS[0],
            Migration {
                description: "broken",
                statements: &[
                    "CREATE TABLE IF NOT EXISTS scratch (id INTEGER)",
                    "THIS IS NOT SQL",
                ],
            },
        ];

        let manager = memory_pool().await;
        let pool = manager.pool();

        let err = run_migrations(pool, BROKEN).await.unwrap_err();
        assert!(matches!(err, StorageError::Migration { version: 2, .. }));
        assert_eq!(schema_version(pool).await.unwrap(), 1);

        let (tables,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'scratch'",
        )
        .fetch_one(pool)
        .await
        .unwrap();
        assert_eq!(tables, 0);
    }
}
