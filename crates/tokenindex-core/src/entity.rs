//! Derived entity records.
//!
//! Each entity is one occurrence of a contract event. Entities are
//! write-once: a second write for the same [`EntityId`](crate::EntityId)
//! carries identical fields and overwrites in place.

use std::fmt;
use std::str::FromStr;

use alloy_primitives::{Address, Bytes, B256, U256};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::IndexerError;
use crate::event::BlockContext;

// ─── EntityKind ───────────────────────────────────────────────────────────────

/// The entity types this pipeline materializes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Approval,
    Transfer,
    OwnershipTransferred,
    GreetingChange,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        Self::Approval,
        Self::Transfer,
        Self::OwnershipTransferred,
        Self::GreetingChange,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approval => "Approval",
            Self::Transfer => "Transfer",
            Self::OwnershipTransferred => "OwnershipTransferred",
            Self::GreetingChange => "GreetingChange",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = IndexerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| IndexerError::Config(format!("unknown entity kind '{s}'")))
    }
}

// ─── Field values ─────────────────────────────────────────────────────────────

/// A single entity field value, as handed to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum FieldValue {
    Address(Address),
    /// Unsigned 256-bit integer, passed through unscaled.
    BigInt(U256),
    UInt(u64),
    Bytes(Bytes),
    Text(String),
    Bool(bool),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address(a) => write!(f, "{a}"),
            Self::BigInt(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "{v}"),
            Self::Bytes(b) => write!(f, "0x{}", hex::encode(b)),
            Self::Text(s) => write!(f, "{s}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// Field name → value, in schema order.
pub type FieldMap = IndexMap<String, FieldValue>;

// ─── Entities ─────────────────────────────────────────────────────────────────

/// Fields shared by every entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityMeta {
    pub block_number: u64,
    pub block_timestamp: u64,
    pub transaction_hash: B256,
}

impl EntityMeta {
    pub fn from_context(ctx: &BlockContext) -> Self {
        Self {
            block_number: ctx.block_number,
            block_timestamp: ctx.block_timestamp,
            transaction_hash: ctx.transaction_hash,
        }
    }

    fn append_to(self, fields: &mut FieldMap) {
        fields.insert("blockNumber".into(), FieldValue::UInt(self.block_number));
        fields.insert("blockTimestamp".into(), FieldValue::UInt(self.block_timestamp));
        fields.insert(
            "transactionHash".into(),
            FieldValue::Bytes(Bytes::copy_from_slice(self.transaction_hash.as_slice())),
        );
    }
}

/// A typed entity that can be flattened into store fields.
pub trait Entity {
    const KIND: EntityKind;

    /// Flatten into `(name, value)` pairs: payload fields first, then the
    /// common block fields.
    fn into_fields(self) -> FieldMap;

    fn into_record(self) -> EntityRecord
    where
        Self: Sized,
    {
        EntityRecord {
            kind: Self::KIND,
            fields: self.into_fields(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Approval {
    pub owner: Address,
    pub spender: Address,
    pub value: U256,
    pub meta: EntityMeta,
}

impl Entity for Approval {
    const KIND: EntityKind = EntityKind::Approval;

    fn into_fields(self) -> FieldMap {
        let mut fields = FieldMap::new();
        fields.insert("owner".into(), FieldValue::Address(self.owner));
        fields.insert("spender".into(), FieldValue::Address(self.spender));
        fields.insert("value".into(), FieldValue::BigInt(self.value));
        self.meta.append_to(&mut fields);
        fields
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub meta: EntityMeta,
}

impl Entity for Transfer {
    const KIND: EntityKind = EntityKind::Transfer;

    fn into_fields(self) -> FieldMap {
        let mut fields = FieldMap::new();
        fields.insert("from".into(), FieldValue::Address(self.from));
        fields.insert("to".into(), FieldValue::Address(self.to));
        fields.insert("value".into(), FieldValue::BigInt(self.value));
        self.meta.append_to(&mut fields);
        fields
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnershipTransferred {
    pub previous_owner: Address,
    pub new_owner: Address,
    pub meta: EntityMeta,
}

impl Entity for OwnershipTransferred {
    const KIND: EntityKind = EntityKind::OwnershipTransferred;

    fn into_fields(self) -> FieldMap {
        let mut fields = FieldMap::new();
        fields.insert("previousOwner".into(), FieldValue::Address(self.previous_owner));
        fields.insert("newOwner".into(), FieldValue::Address(self.new_owner));
        self.meta.append_to(&mut fields);
        fields
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GreetingChange {
    pub greeting_setter: Address,
    pub new_greeting: String,
    pub premium: bool,
    pub value: U256,
    pub meta: EntityMeta,
}

impl Entity for GreetingChange {
    const KIND: EntityKind = EntityKind::GreetingChange;

    fn into_fields(self) -> FieldMap {
        let mut fields = FieldMap::new();
        fields.insert("greetingSetter".into(), FieldValue::Address(self.greeting_setter));
        fields.insert("newGreeting".into(), FieldValue::Text(self.new_greeting));
        fields.insert("premium".into(), FieldValue::Bool(self.premium));
        fields.insert("value".into(), FieldValue::BigInt(self.value));
        self.meta.append_to(&mut fields);
        fields
    }
}

/// An entity in store-boundary form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRecord {
    pub kind: EntityKind,
    pub fields: FieldMap,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> EntityMeta {
        EntityMeta {
            block_number: 100,
            block_timestamp: 1_700_000_000,
            transaction_hash: B256::repeat_byte(0xaa),
        }
    }

    #[test]
    fn fields_follow_schema_order() {
        let record = OwnershipTransferred {
            previous_owner: Address::repeat_byte(0x01),
            new_owner: Address::repeat_byte(0x02),
            meta: meta(),
        }
        .into_record();

        assert_eq!(record.kind, EntityKind::OwnershipTransferred);
        let names: Vec<_> = record.fields.keys().map(String::as_str).collect();
        assert_eq!(
            names,
            ["previousOwner", "newOwner", "blockNumber", "blockTimestamp", "transactionHash"]
        );
    }

    #[test]
    fn transaction_hash_is_32_bytes() {
        let fields = Transfer {
            from: Address::ZERO,
            to: Address::ZERO,
            value: U256::ZERO,
            meta: meta(),
        }
        .into_fields();
        match &fields["transactionHash"] {
            FieldValue::Bytes(b) => assert_eq!(b.as_ref(), &[0xaa; 32]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn kind_parses_from_name() {
        for kind in EntityKind::ALL {
            assert_eq!(kind.as_str().parse::<EntityKind>().unwrap(), kind);
        }
        assert!("Mint".parse::<EntityKind>().is_err());
    }

    #[test]
    fn big_int_value_is_not_scaled() {
        let raw = U256::from(21_000_000u64) * U256::from(10u64).pow(U256::from(18u64));
        let fields = Approval {
            owner: Address::ZERO,
            spender: Address::ZERO,
            value: raw,
            meta: meta(),
        }
        .into_fields();
        assert_eq!(fields["value"], FieldValue::BigInt(raw));
        assert_eq!(fields["value"].to_string(), "21000000000000000000000000");
    }
}
