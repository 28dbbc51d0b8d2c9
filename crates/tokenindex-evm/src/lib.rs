//! tokenindex-evm: turns raw EVM logs of the token contract into decoded
//! events and groups them into contiguous driver batches.

pub mod abi;
pub mod batch;
pub mod decoder;

pub use batch::into_batches;
pub use decoder::{LogDecoder, RawLog};
