//! The indexing driver: runs one batch of blocks through the dispatcher.
//!
//! # States
//! - `Idle`: waiting for the next batch.
//! - `Processing(range)`: dispatching the logs of `range`, one acknowledged
//!   write at a time, in `(blockNumber, logIndex)` order.
//! - `Faulted(fault)`: a store-boundary error aborted the batch. The failed
//!   range stays outstanding; the host retries the whole batch.
//!
//! There is no partial commit bookkeeping. Mapping and identifier derivation
//! are deterministic, so re-running a batch from scratch rewrites identical
//! records under identical ids.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::IndexerConfig;
use crate::dispatcher::{DispatchOutcome, EventDispatcher};
use crate::error::IndexerError;
use crate::event::{BlockContext, DecodedEvent};
use crate::store::EntityStore;

// ─── Batches ──────────────────────────────────────────────────────────────────

/// An inclusive range of block numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRange {
    pub from: u64,
    pub to: u64,
}

impl BlockRange {
    pub fn new(from: u64, to: u64) -> Self {
        Self { from, to }
    }

    pub fn contains(&self, block: u64) -> bool {
        self.from <= block && block <= self.to
    }

    /// Number of blocks in the range. Saturates at `u64::MAX` for `0..=u64::MAX`.
    pub fn len(&self) -> u64 {
        if self.is_empty() {
            return 0;
        }
        (self.to - self.from).saturating_add(1)
    }

    pub fn is_empty(&self) -> bool {
        self.to < self.from
    }
}

impl fmt::Display for BlockRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.from, self.to)
    }
}

/// The decoded logs of one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockLogs {
    pub number: u64,
    pub events: Vec<DecodedEvent>,
}

impl BlockLogs {
    pub fn new(number: u64, events: Vec<DecodedEvent>) -> Self {
        Self { number, events }
    }

    pub fn empty(number: u64) -> Self {
        Self::new(number, Vec::new())
    }
}

/// A contiguous run of blocks handed to the driver in one go.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventBatch {
    pub blocks: Vec<BlockLogs>,
}

impl EventBatch {
    pub fn new(blocks: Vec<BlockLogs>) -> Self {
        Self { blocks }
    }

    /// The lowest and highest block numbers in the batch.
    pub fn range(&self) -> Option<BlockRange> {
        let from = self.blocks.iter().map(|b| b.number).min()?;
        let to = self.blocks.iter().map(|b| b.number).max()?;
        Some(BlockRange::new(from, to))
    }

    pub fn event_count(&self) -> usize {
        self.blocks.iter().map(|b| b.events.len()).sum()
    }

    /// Validate contiguity and flatten into canonical dispatch order.
    fn into_ordered(mut self) -> Result<(BlockRange, Vec<DecodedEvent>), IndexerError> {
        let range = self.range().ok_or_else(|| IndexerError::MalformedBatch {
            reason: "batch contains no blocks".into(),
        })?;

        self.blocks.sort_by_key(|b| b.number);
        for pair in self.blocks.windows(2) {
            if pair[0].number.checked_add(1) != Some(pair[1].number) {
                return Err(IndexerError::MalformedBatch {
                    reason: format!(
                        "block {} follows block {}, expected the next block",
                        pair[1].number, pair[0].number
                    ),
                });
            }
        }

        let mut events = Vec::with_capacity(self.event_count());
        for block in self.blocks {
            if let Some(stray) = block
                .events
                .iter()
                .find(|e| e.context.block_number != block.number)
            {
                return Err(IndexerError::MalformedBatch {
                    reason: format!(
                        "log {} of block {} delivered under block {}",
                        stray.context.log_index, stray.context.block_number, block.number
                    ),
                });
            }
            events.extend(block.events);
        }

        // Stable: logs sharing a key keep their delivery order.
        events.sort_by_key(|e| e.context.ordering_key());
        Ok((range, events))
    }
}

// ─── State ────────────────────────────────────────────────────────────────────

/// A batch attempt aborted by a store-boundary error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverFault {
    /// The block range that must be redelivered.
    pub range: BlockRange,
    pub error: IndexerError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Processing(BlockRange),
    Faulted(DriverFault),
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Processing(range) => write!(f, "processing {range}"),
            Self::Faulted(fault) => write!(f, "faulted at {}: {}", fault.range, fault.error),
        }
    }
}

/// An event that could not be mapped and was left out of the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEvent {
    pub kind: String,
    pub context: BlockContext,
    pub error: IndexerError,
}

/// Summary of a successfully processed batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub range: BlockRange,
    /// Entities written (including idempotent overwrites).
    pub written: usize,
    /// Events of untracked or unrecognized kinds.
    pub ignored: usize,
    pub skipped: Vec<SkippedEvent>,
}

// ─── Driver ───────────────────────────────────────────────────────────────────

/// Drives ordered batches through an [`EventDispatcher`].
pub struct IndexingDriver {
    dispatcher: EventDispatcher,
    state: DriverState,
}

impl IndexingDriver {
    pub fn new(dispatcher: EventDispatcher) -> Self {
        Self {
            dispatcher,
            state: DriverState::Idle,
        }
    }

    /// Build a driver writing to `store`, tracking the kinds listed in `config`.
    pub fn from_config(config: &IndexerConfig, store: Arc<dyn EntityStore>) -> Self {
        info!(
            indexer = %config.id,
            chain = %config.chain,
            from_block = config.from_block,
            tracked = config.entities.len(),
            "indexing driver configured"
        );
        Self::new(EventDispatcher::new(store).with_tracked(config.entities.iter().copied()))
    }

    pub fn state(&self) -> &DriverState {
        &self.state
    }

    /// The range awaiting redelivery, if the last attempt faulted.
    pub fn failed_range(&self) -> Option<BlockRange> {
        match &self.state {
            DriverState::Faulted(fault) => Some(fault.range),
            _ => None,
        }
    }

    /// Give up on the outstanding batch and return to `Idle`.
    pub fn clear_fault(&mut self) {
        if let DriverState::Faulted(fault) = &self.state {
            info!(range = %fault.range, "fault cleared");
            self.state = DriverState::Idle;
        }
    }

    /// Dispatch every log of `batch` in `(blockNumber, logIndex)` order.
    ///
    /// Malformed batches are rejected without a state change. A store-boundary
    /// error moves the driver to `Faulted` and is returned; calling this again
    /// with the same batch retries it from scratch.
    pub async fn process_batch(&mut self, batch: EventBatch) -> Result<BatchReport, IndexerError> {
        let (range, events) = batch.into_ordered()?;

        match &self.state {
            DriverState::Idle => {}
            DriverState::Faulted(fault) => {
                info!(failed = %fault.range, range = %range, "retrying after fault");
            }
            DriverState::Processing(prev) => {
                warn!(interrupted = %prev, range = %range, "previous batch attempt was interrupted");
            }
        }

        self.state = DriverState::Processing(range);
        debug!(range = %range, events = events.len(), "processing batch");

        let mut report = BatchReport {
            range,
            written: 0,
            ignored: 0,
            skipped: Vec::new(),
        };

        for event in events {
            match self.dispatcher.dispatch(&event).await {
                Ok(DispatchOutcome::Written(_)) => report.written += 1,
                Ok(DispatchOutcome::Ignored) => report.ignored += 1,
                Err(error) if error.is_event_local() => {
                    warn!(
                        kind = event.kind(),
                        block = event.context.block_number,
                        log_index = event.context.log_index,
                        %error,
                        "skipping event"
                    );
                    report.skipped.push(SkippedEvent {
                        kind: event.kind().to_string(),
                        context: event.context,
                        error,
                    });
                }
                Err(error) => {
                    warn!(range = %range, %error, "batch faulted");
                    self.state = DriverState::Faulted(DriverFault {
                        range,
                        error: error.clone(),
                    });
                    return Err(error);
                }
            }
        }

        self.state = DriverState::Idle;
        info!(
            range = %range,
            written = report.written,
            ignored = report.ignored,
            skipped = report.skipped.len(),
            "batch complete"
        );
        Ok(report)
    }
}
