//! Routes decoded events to their field mapper and writes the result.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::entity::EntityKind;
use crate::error::IndexerError;
use crate::event::DecodedEvent;
use crate::id::EntityId;
use crate::mapping;
use crate::store::EntityStore;

/// What happened to a single dispatched event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The entity was written (or idempotently overwritten).
    Written(EntityId),
    /// The event kind is not tracked; nothing was written.
    Ignored,
}

/// Event dispatcher bound to one entity store.
pub struct EventDispatcher {
    store: Arc<dyn EntityStore>,
    /// Entity kinds to write. Empty = all kinds.
    tracked: HashSet<EntityKind>,
}

impl EventDispatcher {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self {
            store,
            tracked: HashSet::new(),
        }
    }

    /// Restrict writes to `kinds`. An empty list tracks every kind.
    pub fn with_tracked(mut self, kinds: impl IntoIterator<Item = EntityKind>) -> Self {
        self.tracked = kinds.into_iter().collect();
        self
    }

    /// Returns `true` if entities of `kind` are written.
    pub fn is_tracked(&self, kind: EntityKind) -> bool {
        self.tracked.is_empty() || self.tracked.contains(&kind)
    }

    /// Map `event` and hand the record to the store.
    ///
    /// The store call is awaited before returning, so callers that dispatch
    /// sequentially get acknowledged, ordered writes.
    ///
    /// The id is derived first, so an oversized log index is reported even
    /// for kinds that would otherwise be ignored.
    pub async fn dispatch(&self, event: &DecodedEvent) -> Result<DispatchOutcome, IndexerError> {
        let ctx = &event.context;
        let id = EntityId::derive(&ctx.transaction_hash, ctx.log_index)?;

        let Some(record) = mapping::map_event(event) else {
            debug!(kind = event.kind(), "ignoring unrecognized event kind");
            return Ok(DispatchOutcome::Ignored);
        };
        if !self.is_tracked(record.kind) {
            debug!(kind = %record.kind, "ignoring untracked entity kind");
            return Ok(DispatchOutcome::Ignored);
        }

        self.store.put(&id, record.kind, &record.fields).await?;
        debug!(
            %id,
            kind = %record.kind,
            block = ctx.block_number,
            log_index = ctx.log_index,
            "entity written"
        );
        Ok(DispatchOutcome::Written(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::FieldMap;
    use crate::event::{ApprovalEvent, BlockContext, EventPayload, TransferEvent};
    use alloy_primitives::{Address, B256, U256};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Capture(Mutex<Vec<(EntityId, EntityKind, FieldMap)>>);

    #[async_trait]
    impl EntityStore for Capture {
        async fn put(
            &self,
            id: &EntityId,
            kind: EntityKind,
            fields: &FieldMap,
        ) -> Result<(), IndexerError> {
            self.0.lock().unwrap().push((*id, kind, fields.clone()));
            Ok(())
        }
    }

    struct Down;

    #[async_trait]
    impl EntityStore for Down {
        async fn put(&self, _: &EntityId, _: EntityKind, _: &FieldMap) -> Result<(), IndexerError> {
            Err(IndexerError::StorageUnavailable("connection refused".into()))
        }
    }

    fn ctx(log_index: u64) -> BlockContext {
        BlockContext {
            block_number: 100,
            block_timestamp: 1_700_000_000,
            transaction_hash: B256::repeat_byte(0xaa),
            log_index,
        }
    }

    fn transfer(log_index: u64) -> DecodedEvent {
        DecodedEvent::new(
            EventPayload::Transfer(TransferEvent {
                from: Address::with_last_byte(1),
                to: Address::with_last_byte(2),
                value: U256::from(50),
            }),
            ctx(log_index),
        )
    }

    fn approval(log_index: u64) -> DecodedEvent {
        DecodedEvent::new(
            EventPayload::Approval(ApprovalEvent {
                owner: Address::with_last_byte(2),
                spender: Address::with_last_byte(3),
                value: U256::from(50),
            }),
            ctx(log_index),
        )
    }

    #[tokio::test]
    async fn dispatch_writes_with_derived_id() {
        let store = Arc::new(Capture::default());
        let dispatcher = EventDispatcher::new(store.clone());

        let outcome = dispatcher.dispatch(&transfer(1)).await.unwrap();
        let expected = EntityId::derive(&B256::repeat_byte(0xaa), 1).unwrap();
        assert_eq!(outcome, DispatchOutcome::Written(expected));

        let writes = store.0.lock().unwrap();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].0, expected);
        assert_eq!(writes[0].1, EntityKind::Transfer);
    }

    #[tokio::test]
    async fn unrecognized_kind_is_ignored() {
        let store = Arc::new(Capture::default());
        let dispatcher = EventDispatcher::new(store.clone());

        let event = DecodedEvent::new(EventPayload::Unrecognized { kind: "Paused".into() }, ctx(0));
        assert_eq!(dispatcher.dispatch(&event).await.unwrap(), DispatchOutcome::Ignored);
        assert!(store.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn untracked_kind_is_ignored() {
        let store = Arc::new(Capture::default());
        let dispatcher = EventDispatcher::new(store.clone()).with_tracked([EntityKind::Approval]);

        assert_eq!(dispatcher.dispatch(&transfer(0)).await.unwrap(), DispatchOutcome::Ignored);
        assert!(matches!(
            dispatcher.dispatch(&approval(1)).await.unwrap(),
            DispatchOutcome::Written(_)
        ));
        assert_eq!(store.0.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn oversized_log_index_fails_before_write() {
        let store = Arc::new(Capture::default());
        let dispatcher = EventDispatcher::new(store.clone());

        let err = dispatcher.dispatch(&transfer(u64::from(u32::MAX) + 1)).await.unwrap_err();
        assert!(matches!(err, IndexerError::InvalidLogIndex { .. }));
        assert!(store.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn oversized_log_index_is_reported_for_ignored_kinds() {
        let store = Arc::new(Capture::default());
        let dispatcher = EventDispatcher::new(store.clone()).with_tracked([EntityKind::Approval]);

        let err = dispatcher.dispatch(&transfer(1u64 << 40)).await.unwrap_err();
        assert_eq!(err, IndexerError::InvalidLogIndex { log_index: 1u64 << 40 });

        let unknown = DecodedEvent::new(
            EventPayload::Unrecognized { kind: "Paused".into() },
            ctx(1u64 << 40),
        );
        assert!(dispatcher.dispatch(&unknown).await.unwrap_err().is_event_local());
        assert!(store.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn store_failure_propagates() {
        let dispatcher = EventDispatcher::new(Arc::new(Down));
        let err = dispatcher.dispatch(&transfer(0)).await.unwrap_err();
        assert!(err.is_batch_fatal());
    }
}
