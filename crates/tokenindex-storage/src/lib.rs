//! tokenindex-storage: upsert store backends for TokenIndex.
//!
//! Backends:
//! - `memory`: in-memory (dev/testing, no persistence)
//! - `sqlite`: SQLite via `sqlx` (embedded, single-file persistence)

use tokenindex_core::entity::{EntityKind, FieldMap};

#[cfg(feature = "memory")]
pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "memory")]
pub use memory::InMemoryStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

/// An entity as read back from a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntity {
    pub kind: EntityKind,
    pub fields: FieldMap,
}
