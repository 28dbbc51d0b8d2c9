//! Decoded contract events and the block context they were emitted in.

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

// ─── BlockContext ─────────────────────────────────────────────────────────────

/// Where a log sits on chain. Every field is an immutable on-chain fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockContext {
    /// Number of the block containing the log.
    pub block_number: u64,
    /// Block timestamp (seconds since epoch).
    pub block_timestamp: u64,
    /// Hash of the transaction that emitted the log.
    pub transaction_hash: B256,
    /// Position of the log in the transaction receipt.
    pub log_index: u64,
}

impl BlockContext {
    /// The canonical processing order of logs: `(blockNumber, logIndex)`.
    pub fn ordering_key(&self) -> (u64, u64) {
        (self.block_number, self.log_index)
    }
}

// ─── Payloads ─────────────────────────────────────────────────────────────────

/// `Approval(address indexed owner, address indexed spender, uint256 value)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalEvent {
    pub owner: Address,
    pub spender: Address,
    pub value: U256,
}

/// `Transfer(address indexed from, address indexed to, uint256 value)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferEvent {
    pub from: Address,
    pub to: Address,
    pub value: U256,
}

/// `OwnershipTransferred(address indexed previousOwner, address indexed newOwner)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipTransferredEvent {
    pub previous_owner: Address,
    pub new_owner: Address,
}

/// `GreetingChange(address indexed greetingSetter, string newGreeting, bool premium, uint256 value)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GreetingChangeEvent {
    pub greeting_setter: Address,
    pub new_greeting: String,
    pub premium: bool,
    pub value: U256,
}

/// The typed payload of a decoded event, tagged by event kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "params")]
pub enum EventPayload {
    Approval(ApprovalEvent),
    Transfer(TransferEvent),
    OwnershipTransferred(OwnershipTransferredEvent),
    GreetingChange(GreetingChangeEvent),
    /// An event the contract emits that this pipeline does not track.
    Unrecognized { kind: String },
}

impl EventPayload {
    /// The event kind tag (e.g. `"Transfer"`).
    pub fn kind(&self) -> &str {
        match self {
            Self::Approval(_) => "Approval",
            Self::Transfer(_) => "Transfer",
            Self::OwnershipTransferred(_) => "OwnershipTransferred",
            Self::GreetingChange(_) => "GreetingChange",
            Self::Unrecognized { kind } => kind,
        }
    }
}

// ─── DecodedEvent ─────────────────────────────────────────────────────────────

/// A decoded log together with its block context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedEvent {
    pub payload: EventPayload,
    pub context: BlockContext,
}

impl DecodedEvent {
    pub fn new(payload: EventPayload, context: BlockContext) -> Self {
        Self { payload, context }
    }

    pub fn kind(&self) -> &str {
        self.payload.kind()
    }
}
