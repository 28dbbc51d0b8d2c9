//! Field mappers: one pure function per event kind.
//!
//! Payload values are copied verbatim (token amounts stay raw integers) and
//! the common block fields are attached unchanged. No validation happens here.

use crate::entity::{
    Approval, Entity, EntityMeta, EntityRecord, GreetingChange, OwnershipTransferred, Transfer,
};
use crate::event::{
    ApprovalEvent, BlockContext, DecodedEvent, EventPayload, GreetingChangeEvent,
    OwnershipTransferredEvent, TransferEvent,
};

pub fn map_approval(event: &ApprovalEvent, ctx: &BlockContext) -> Approval {
    Approval {
        owner: event.owner,
        spender: event.spender,
        value: event.value,
        meta: EntityMeta::from_context(ctx),
    }
}

pub fn map_transfer(event: &TransferEvent, ctx: &BlockContext) -> Transfer {
    Transfer {
        from: event.from,
        to: event.to,
        value: event.value,
        meta: EntityMeta::from_context(ctx),
    }
}

pub fn map_ownership_transferred(
    event: &OwnershipTransferredEvent,
    ctx: &BlockContext,
) -> OwnershipTransferred {
    OwnershipTransferred {
        previous_owner: event.previous_owner,
        new_owner: event.new_owner,
        meta: EntityMeta::from_context(ctx),
    }
}

pub fn map_greeting_change(event: &GreetingChangeEvent, ctx: &BlockContext) -> GreetingChange {
    GreetingChange {
        greeting_setter: event.greeting_setter,
        new_greeting: event.new_greeting.clone(),
        premium: event.premium,
        value: event.value,
        meta: EntityMeta::from_context(ctx),
    }
}

/// Select the mapper for `event` and build its record.
///
/// Returns `None` for event kinds the pipeline does not track.
pub fn map_event(event: &DecodedEvent) -> Option<EntityRecord> {
    let ctx = &event.context;
    let record = match &event.payload {
        EventPayload::Approval(e) => map_approval(e, ctx).into_record(),
        EventPayload::Transfer(e) => map_transfer(e, ctx).into_record(),
        EventPayload::OwnershipTransferred(e) => map_ownership_transferred(e, ctx).into_record(),
        EventPayload::GreetingChange(e) => map_greeting_change(e, ctx).into_record(),
        EventPayload::Unrecognized { .. } => return None,
    };
    Some(record)
}
