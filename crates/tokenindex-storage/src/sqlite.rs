//! SQLite entity store.
//!
//! Persists entities to a single table keyed by the 36-byte entity id.
//! `put` is a single `INSERT … ON CONFLICT DO UPDATE`, so it is atomic per
//! call and absorbs replays.
//!
//! # Usage
//! ```rust,no_run
//! use tokenindex_storage::sqlite::SqliteStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // File-backed (persistent)
//! let store = SqliteStore::open("./entities.db").await?;
//!
//! // In-memory (tests / ephemeral)
//! let store = SqliteStore::in_memory().await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use tokenindex_core::entity::{EntityKind, FieldMap};
use tokenindex_core::error::IndexerError;
use tokenindex_core::id::EntityId;
use tokenindex_core::store::EntityStore;

use crate::StoredEntity;

/// SQLite-backed entity store.
pub struct SqliteStore {
    pool: SqlitePool,
}

/// Connection-level failures are reported as unavailability; everything
/// else is a plain storage error.
fn storage_err(e: sqlx::Error) -> IndexerError {
    match &e {
        sqlx::Error::Io(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => IndexerError::StorageUnavailable(e.to_string()),
        _ => IndexerError::Storage(e.to_string()),
    }
}

impl SqliteStore {
    /// Open (or create) a SQLite database at `path`.
    ///
    /// The path may be a plain file path (`"./entities.db"`) or a full
    /// SQLite URL (`"sqlite:./entities.db?mode=rwc"`).
    pub async fn open(path: &str) -> Result<Self, IndexerError> {
        let url = if path.starts_with("sqlite:") {
            path.to_string()
        } else {
            format!("sqlite:{path}?mode=rwc")
        };

        let pool = SqlitePool::connect(&url).await.map_err(storage_err)?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Open an in-memory SQLite database.
    ///
    /// Pinned to one connection that never expires; each SQLite in-memory
    /// connection is its own database.
    pub async fn in_memory() -> Result<Self, IndexerError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect("sqlite::memory:")
            .await
            .map_err(storage_err)?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), IndexerError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS entities (
                id          BLOB PRIMARY KEY,
                kind        TEXT NOT NULL,
                fields_json TEXT NOT NULL
            );",
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_entities_kind ON entities (kind);")
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;

        Ok(())
    }

    /// Look up an entity by id.
    pub async fn get(&self, id: &EntityId) -> Result<Option<StoredEntity>, IndexerError> {
        let row = sqlx::query("SELECT kind, fields_json FROM entities WHERE id = ?")
            .bind(id.as_bytes().to_vec())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let kind: String = row.try_get("kind").map_err(storage_err)?;
        let fields_json: String = row.try_get("fields_json").map_err(storage_err)?;

        let fields: FieldMap = serde_json::from_str(&fields_json)
            .map_err(|e| IndexerError::Storage(format!("corrupt fields for {id}: {e}")))?;
        Ok(Some(StoredEntity {
            kind: kind.parse()?,
            fields,
        }))
    }

    /// Number of distinct entities held.
    pub async fn entity_count(&self) -> Result<u64, IndexerError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM entities")
            .fetch_one(&self.pool)
            .await
            .map_err(storage_err)?;
        let n: i64 = row.try_get("n").map_err(storage_err)?;
        Ok(n as u64)
    }

    /// Close the pool; later writes fail with `StorageUnavailable`.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl EntityStore for SqliteStore {
    async fn put(
        &self,
        id: &EntityId,
        kind: EntityKind,
        fields: &FieldMap,
    ) -> Result<(), IndexerError> {
        let fields_json =
            serde_json::to_string(fields).map_err(|e| IndexerError::Storage(e.to_string()))?;

        sqlx::query(
            "INSERT INTO entities (id, kind, fields_json) VALUES (?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                kind        = excluded.kind,
                fields_json = excluded.fields_json;",
        )
        .bind(id.as_bytes().to_vec())
        .bind(kind.as_str())
        .bind(fields_json)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        debug!(%id, %kind, "upsert");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, B256, U256};
    use tokenindex_core::entity::FieldValue;

    fn id(log_index: u64) -> EntityId {
        EntityId::derive(&B256::repeat_byte(0xaa), log_index).unwrap()
    }

    fn transfer_fields() -> FieldMap {
        let mut f = FieldMap::new();
        f.insert("from".into(), FieldValue::Address(Address::with_last_byte(1)));
        f.insert("to".into(), FieldValue::Address(Address::with_last_byte(2)));
        f.insert("value".into(), FieldValue::BigInt(U256::from(50)));
        f.insert("blockNumber".into(), FieldValue::UInt(100));
        f
    }

    #[tokio::test]
    async fn upsert_roundtrip_and_idempotence() {
        let store = SqliteStore::in_memory().await.unwrap();
        let fields = transfer_fields();

        store.put(&id(0), EntityKind::Transfer, &fields).await.unwrap();
        store.put(&id(0), EntityKind::Transfer, &fields).await.unwrap();

        assert_eq!(store.entity_count().await.unwrap(), 1);
        let stored = store.get(&id(0)).await.unwrap().unwrap();
        assert_eq!(stored.kind, EntityKind::Transfer);
        assert_eq!(stored.fields, fields);
        assert!(store.get(&id(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn closed_pool_is_unavailable() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.close().await;
        let err = store
            .put(&id(0), EntityKind::Transfer, &transfer_fields())
            .await
            .unwrap_err();
        assert!(err.is_batch_fatal());
    }
}
