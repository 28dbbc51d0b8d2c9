//! Groups decoded events into contiguous driver batches.

use std::collections::BTreeMap;

use tokenindex_core::driver::{BlockLogs, BlockRange, EventBatch};
use tokenindex_core::error::IndexerError;
use tokenindex_core::event::DecodedEvent;

/// Split `range` into batches of at most `batch_size` blocks, placing each
/// event under its block.
///
/// Blocks without events are still emitted (empty) so every batch covers a
/// contiguous run. Events outside `range` are rejected.
pub fn into_batches(
    events: Vec<DecodedEvent>,
    range: BlockRange,
    batch_size: u64,
) -> Result<Vec<EventBatch>, IndexerError> {
    if batch_size == 0 {
        return Err(IndexerError::Config("batch_size must be at least 1".into()));
    }
    if range.is_empty() {
        return Ok(Vec::new());
    }

    let mut by_block: BTreeMap<u64, Vec<DecodedEvent>> = BTreeMap::new();
    for event in events {
        let number = event.context.block_number;
        if !range.contains(number) {
            return Err(IndexerError::MalformedBatch {
                reason: format!("event in block {number} lies outside {range}"),
            });
        }
        by_block.entry(number).or_default().push(event);
    }

    let mut batches = Vec::new();
    let mut start = range.from;
    loop {
        let end = start.saturating_add(batch_size - 1).min(range.to);
        let blocks = (start..=end)
            .map(|n| BlockLogs::new(n, by_block.remove(&n).unwrap_or_default()))
            .collect();
        batches.push(EventBatch::new(blocks));

        if end == range.to {
            break;
        }
        start = end + 1;
    }
    Ok(batches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::B256;
    use tokenindex_core::event::{BlockContext, EventPayload};

    fn ev(block: u64, log_index: u64) -> DecodedEvent {
        DecodedEvent::new(
            EventPayload::Unrecognized { kind: "Test".into() },
            BlockContext {
                block_number: block,
                block_timestamp: 0,
                transaction_hash: B256::ZERO,
                log_index,
            },
        )
    }

    #[test]
    fn splits_range_into_contiguous_batches() {
        let events = vec![ev(12, 0), ev(10, 1), ev(10, 0)];
        let batches = into_batches(events, BlockRange::new(10, 14), 2).unwrap();

        let ranges: Vec<_> = batches.iter().map(|b| b.range().unwrap()).collect();
        assert_eq!(
            ranges,
            vec![BlockRange::new(10, 11), BlockRange::new(12, 13), BlockRange::new(14, 14)]
        );
        assert_eq!(batches[0].event_count(), 2);
        assert_eq!(batches[1].event_count(), 1);
        assert_eq!(batches[2].event_count(), 0);
        assert!(batches[0].blocks[1].events.is_empty());
    }

    #[test]
    fn rejects_events_outside_range() {
        let err = into_batches(vec![ev(99, 0)], BlockRange::new(10, 20), 5).unwrap_err();
        assert!(matches!(err, IndexerError::MalformedBatch { .. }));
    }

    #[test]
    fn rejects_zero_batch_size() {
        assert!(into_batches(vec![], BlockRange::new(1, 1), 0).is_err());
    }

    #[test]
    fn range_ending_at_u64_max_terminates() {
        let batches = into_batches(vec![], BlockRange::new(u64::MAX - 1, u64::MAX), 10).unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].blocks.len(), 2);
    }
}
