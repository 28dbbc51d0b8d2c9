//! The write boundary to persistent storage.

use async_trait::async_trait;

use crate::entity::{EntityKind, FieldMap};
use crate::error::IndexerError;
use crate::id::EntityId;

/// Upsert store for derived entities.
///
/// Implementations must make each `put` atomic and must absorb repeated
/// identical calls without error or duplication. Store-boundary failures
/// should be reported as [`IndexerError::StorageUnavailable`] or
/// [`IndexerError::Storage`].
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Create the entity if absent, otherwise overwrite it in place.
    async fn put(
        &self,
        id: &EntityId,
        kind: EntityKind,
        fields: &FieldMap,
    ) -> Result<(), IndexerError>;
}
