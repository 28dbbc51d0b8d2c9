//! tokenindex-core: deterministic, replay-safe mapping of token contract
//! events into write-once entity records.
//!
//! # Architecture
//!
//! ```text
//! EventBatch → IndexingDriver   (ordering, batch state machine)
//!                  └── EventDispatcher   (routes by event kind)
//!                          ├── mapping::map_*   (pure field mappers)
//!                          ├── EntityId::derive (tx hash ‖ log index)
//!                          └── EntityStore      (idempotent upsert boundary)
//! ```

pub mod config;
pub mod dispatcher;
pub mod driver;
pub mod entity;
pub mod error;
pub mod event;
pub mod id;
pub mod logging;
pub mod mapping;
pub mod store;

pub use config::IndexerConfig;
pub use dispatcher::{DispatchOutcome, EventDispatcher};
pub use driver::{BatchReport, BlockLogs, BlockRange, DriverState, EventBatch, IndexingDriver};
pub use entity::{Entity, EntityKind, EntityRecord, FieldMap, FieldValue};
pub use error::IndexerError;
pub use event::{BlockContext, DecodedEvent, EventPayload};
pub use id::EntityId;
pub use logging::{init_tracing, LogConfig};
pub use store::EntityStore;
