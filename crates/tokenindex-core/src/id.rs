//! Entity identifiers.
//!
//! Every entity is keyed by `transactionHash ‖ bigEndian32(logIndex)`. Both
//! halves are immutable on-chain facts, so replaying the same log always
//! yields the same key regardless of when or how often it is delivered.

use std::fmt;
use std::str::FromStr;

use alloy_primitives::B256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::IndexerError;

/// Length in bytes of an encoded [`EntityId`].
pub const ENTITY_ID_LEN: usize = 36;

/// A 36-byte entity key: 32-byte transaction hash followed by the
/// big-endian 4-byte log index.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId([u8; ENTITY_ID_LEN]);

impl EntityId {
    /// Derive the identifier for the log at `log_index` in `tx_hash`.
    ///
    /// Fails with [`IndexerError::InvalidLogIndex`] when `log_index` does not
    /// fit in 32 bits instead of truncating it.
    pub fn derive(tx_hash: &B256, log_index: u64) -> Result<Self, IndexerError> {
        let index = u32::try_from(log_index)
            .map_err(|_| IndexerError::InvalidLogIndex { log_index })?;

        let mut bytes = [0u8; ENTITY_ID_LEN];
        bytes[..32].copy_from_slice(tx_hash.as_slice());
        bytes[32..].copy_from_slice(&index.to_be_bytes());
        Ok(Self(bytes))
    }

    /// Build an identifier from its raw encoding.
    pub fn from_bytes(bytes: [u8; ENTITY_ID_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ENTITY_ID_LEN] {
        &self.0
    }

    /// The transaction hash half of the key.
    pub fn transaction_hash(&self) -> B256 {
        B256::from_slice(&self.0[..32])
    }

    /// The log index half of the key.
    pub fn log_index(&self) -> u32 {
        let mut tail = [0u8; 4];
        tail.copy_from_slice(&self.0[32..]);
        u32::from_be_bytes(tail)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({self})")
    }
}

impl FromStr for EntityId {
    type Err = IndexerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("0x").unwrap_or(s);
        let decoded = hex::decode(raw).map_err(|e| IndexerError::Decode {
            event: "EntityId".into(),
            reason: e.to_string(),
        })?;
        let bytes: [u8; ENTITY_ID_LEN] =
            decoded.try_into().map_err(|v: Vec<u8>| IndexerError::Decode {
                event: "EntityId".into(),
                reason: format!("expected {ENTITY_ID_LEN} bytes, got {}", v.len()),
            })?;
        Ok(Self(bytes))
    }
}

impl Serialize for EntityId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
