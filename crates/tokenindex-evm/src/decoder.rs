//! Raw EVM log → [`DecodedEvent`].
//!
//! topic0 selects the ABI event; indexed params come from the remaining
//! topics and the rest from `data`. Logs with a topic0 outside the token
//! ABI become [`EventPayload::Unrecognized`] so the dispatcher can drop them.

use alloy_primitives::{Address, Bytes, B256};
use alloy_sol_types::SolEvent;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::trace;

use tokenindex_core::config::IndexerConfig;
use tokenindex_core::error::IndexerError;
use tokenindex_core::event::{
    ApprovalEvent, BlockContext, DecodedEvent, EventPayload, GreetingChangeEvent,
    OwnershipTransferredEvent, TransferEvent,
};

use crate::abi;

/// A raw EVM log as returned by `eth_getLogs` (with `blockTimestamp`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    #[serde(deserialize_with = "quantity")]
    pub block_number: u64,
    #[serde(deserialize_with = "quantity")]
    pub block_timestamp: u64,
    pub transaction_hash: B256,
    #[serde(deserialize_with = "quantity")]
    pub log_index: u64,
    #[serde(default)]
    pub removed: bool,
}

impl RawLog {
    pub fn context(&self) -> BlockContext {
        BlockContext {
            block_number: self.block_number,
            block_timestamp: self.block_timestamp,
            transaction_hash: self.transaction_hash,
            log_index: self.log_index,
        }
    }
}

/// Accept either a JSON number or a `0x`-prefixed hex quantity.
fn quantity<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Quantity {
        Num(u64),
        Hex(String),
    }

    match Quantity::deserialize(deserializer)? {
        Quantity::Num(n) => Ok(n),
        Quantity::Hex(s) => {
            let digits = s
                .strip_prefix("0x")
                .ok_or_else(|| serde::de::Error::custom(format!("quantity '{s}' lacks 0x prefix")))?;
            u64::from_str_radix(digits, 16).map_err(serde::de::Error::custom)
        }
    }
}

/// Decodes token contract logs.
#[derive(Debug, Clone, Default)]
pub struct LogDecoder {
    /// Only logs emitted by this address are decoded. `None` = any address.
    contract: Option<Address>,
}

impl LogDecoder {
    pub fn new(contract: Option<Address>) -> Self {
        Self { contract }
    }

    pub fn from_config(config: &IndexerConfig) -> Self {
        Self::new(config.contract)
    }

    /// Decode one log.
    ///
    /// Returns `Ok(None)` for removed logs and logs from other contracts, and
    /// `Err(IndexerError::Decode)` when a known event's data does not match
    /// its ABI.
    pub fn decode(&self, log: &RawLog) -> Result<Option<DecodedEvent>, IndexerError> {
        if log.removed {
            trace!(tx = %log.transaction_hash, log_index = log.log_index, "skipping removed log");
            return Ok(None);
        }
        if self.contract.is_some_and(|c| c != log.address) {
            return Ok(None);
        }

        let Some(topic0) = log.topics.first().copied() else {
            return Ok(Some(DecodedEvent::new(
                EventPayload::Unrecognized {
                    kind: "anonymous".into(),
                },
                log.context(),
            )));
        };

        let payload = if topic0 == abi::Approval::SIGNATURE_HASH {
            let e = decode_as::<abi::Approval>(log)?;
            EventPayload::Approval(ApprovalEvent {
                owner: e.owner,
                spender: e.spender,
                value: e.value,
            })
        } else if topic0 == abi::Transfer::SIGNATURE_HASH {
            let e = decode_as::<abi::Transfer>(log)?;
            EventPayload::Transfer(TransferEvent {
                from: e.from,
                to: e.to,
                value: e.value,
            })
        } else if topic0 == abi::OwnershipTransferred::SIGNATURE_HASH {
            let e = decode_as::<abi::OwnershipTransferred>(log)?;
            EventPayload::OwnershipTransferred(OwnershipTransferredEvent {
                previous_owner: e.previousOwner,
                new_owner: e.newOwner,
            })
        } else if topic0 == abi::GreetingChange::SIGNATURE_HASH {
            let e = decode_as::<abi::GreetingChange>(log)?;
            EventPayload::GreetingChange(GreetingChangeEvent {
                greeting_setter: e.greetingSetter,
                new_greeting: e.newGreeting,
                premium: e.premium,
                value: e.value,
            })
        } else {
            EventPayload::Unrecognized {
                kind: format!("{topic0:#x}"),
            }
        };

        Ok(Some(DecodedEvent::new(payload, log.context())))
    }

    /// Decode a slice of logs, collecting failures instead of stopping.
    pub fn decode_all(&self, logs: &[RawLog]) -> (Vec<DecodedEvent>, Vec<IndexerError>) {
        let mut events = Vec::with_capacity(logs.len());
        let mut errors = Vec::new();
        for log in logs {
            match self.decode(log) {
                Ok(Some(event)) => events.push(event),
                Ok(None) => {}
                Err(e) => errors.push(e),
            }
        }
        (events, errors)
    }
}

fn decode_as<E: SolEvent>(log: &RawLog) -> Result<E, IndexerError> {
    E::decode_raw_log(log.topics.iter().copied(), &log.data, true).map_err(|e| {
        IndexerError::Decode {
            event: E::SIGNATURE.to_string(),
            reason: e.to_string(),
        }
    })
}
