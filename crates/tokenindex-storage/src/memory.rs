//! In-memory entity store.
//!
//! Keeps entities in a `HashMap` keyed by [`EntityId`]. Useful for tests and
//! short-lived indexers that don't need persistence.
//!
//! A store built with [`InMemoryStore::with_write_log`] also records the id of
//! every acknowledged `put`, replays included. That log grows with writes, not
//! entities, so leave it off for long-running indexers.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::trace;

use tokenindex_core::entity::{EntityKind, FieldMap};
use tokenindex_core::error::IndexerError;
use tokenindex_core::id::EntityId;
use tokenindex_core::store::EntityStore;

use crate::StoredEntity;

#[derive(Default)]
struct State {
    entities: HashMap<EntityId, StoredEntity>,
    /// `None` unless enabled with [`InMemoryStore::with_write_log`].
    write_log: Option<Vec<EntityId>>,
}

/// In-memory upsert store. All data is lost when the process exits.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that also records every acknowledged write in order.
    pub fn with_write_log() -> Self {
        Self {
            state: Mutex::new(State {
                entities: HashMap::new(),
                write_log: Some(Vec::new()),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up an entity by id.
    pub fn get(&self, id: &EntityId) -> Option<StoredEntity> {
        self.lock().entities.get(id).cloned()
    }

    /// Number of distinct entities held.
    pub fn entity_count(&self) -> usize {
        self.lock().entities.len()
    }

    /// All entities of `kind`, sorted by id.
    pub fn entities_by_kind(&self, kind: EntityKind) -> Vec<(EntityId, StoredEntity)> {
        let mut matches: Vec<_> = self
            .lock()
            .entities
            .iter()
            .filter(|(_, e)| e.kind == kind)
            .map(|(id, e)| (*id, e.clone()))
            .collect();
        matches.sort_by_key(|(id, _)| *id);
        matches
    }

    /// Ids in the order their writes were acknowledged, duplicates included.
    /// Empty unless the store was built with [`with_write_log`](Self::with_write_log).
    pub fn write_log(&self) -> Vec<EntityId> {
        self.lock().write_log.clone().unwrap_or_default()
    }

    /// Every entity, sorted by id. Two stores fed the same stream produce
    /// equal snapshots.
    pub fn snapshot(&self) -> Vec<(EntityId, StoredEntity)> {
        let mut all: Vec<_> = self
            .lock()
            .entities
            .iter()
            .map(|(id, e)| (*id, e.clone()))
            .collect();
        all.sort_by_key(|(id, _)| *id);
        all
    }

    /// Drop all entities and the write log.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.entities.clear();
        if let Some(log) = state.write_log.as_mut() {
            log.clear();
        }
    }
}

#[async_trait]
impl EntityStore for InMemoryStore {
    async fn put(
        &self,
        id: &EntityId,
        kind: EntityKind,
        fields: &FieldMap,
    ) -> Result<(), IndexerError> {
        let mut state = self.lock();
        let replaced = state
            .entities
            .insert(
                *id,
                StoredEntity {
                    kind,
                    fields: fields.clone(),
                },
            )
            .is_some();
        if let Some(log) = state.write_log.as_mut() {
            log.push(*id);
        }
        trace!(%id, %kind, replaced, "upsert");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::B256;
    use tokenindex_core::entity::FieldValue;

    fn id(log_index: u64) -> EntityId {
        EntityId::derive(&B256::repeat_byte(0xaa), log_index).unwrap()
    }

    fn fields(value: u64) -> FieldMap {
        let mut f = FieldMap::new();
        f.insert("blockNumber".into(), FieldValue::UInt(value));
        f
    }

    #[tokio::test]
    async fn put_is_idempotent() {
        let store = InMemoryStore::with_write_log();
        store.put(&id(0), EntityKind::Transfer, &fields(100)).await.unwrap();
        store.put(&id(0), EntityKind::Transfer, &fields(100)).await.unwrap();

        assert_eq!(store.entity_count(), 1);
        assert_eq!(store.write_log(), vec![id(0), id(0)]);
        assert_eq!(
            store.get(&id(0)),
            Some(StoredEntity {
                kind: EntityKind::Transfer,
                fields: fields(100)
            })
        );
    }

    #[tokio::test]
    async fn query_by_kind() {
        let store = InMemoryStore::new();
        store.put(&id(2), EntityKind::Approval, &fields(1)).await.unwrap();
        store.put(&id(0), EntityKind::Transfer, &fields(1)).await.unwrap();
        store.put(&id(1), EntityKind::Approval, &fields(1)).await.unwrap();

        let approvals = store.entities_by_kind(EntityKind::Approval);
        let ids: Vec<_> = approvals.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![id(1), id(2)]);
        assert!(store.entities_by_kind(EntityKind::GreetingChange).is_empty());
    }

    #[tokio::test]
    async fn write_log_is_off_by_default() {
        let store = InMemoryStore::new();
        for _ in 0..3 {
            store.put(&id(0), EntityKind::Transfer, &fields(1)).await.unwrap();
        }
        assert_eq!(store.entity_count(), 1);
        assert!(store.write_log().is_empty());
    }

    #[tokio::test]
    async fn clear_empties_store() {
        let store = InMemoryStore::with_write_log();
        store.put(&id(0), EntityKind::Transfer, &fields(1)).await.unwrap();
        store.clear();
        assert_eq!(store.entity_count(), 0);
        assert!(store.write_log().is_empty());
    }
}
