//! Central error type for the mesh runtime.
//!
//! Every failure is fatal to the call in progress and propagates to the
//! initiator; nothing in this crate catches and suppresses. Retrying is a
//! decision for whatever layer sits above the mesh.

use berth_core::{Address, MessageError};
use thiserror::Error;

/// Errors surfaced by the transport, entities, and the negotiation loop.
#[derive(Debug, Error)]
pub enum MeshError {
    /// A second handler tried to bind to an address that is already taken.
    #[error("max 1 listener per address: {0} is already bound")]
    DuplicateAddress(Address),

    /// A message was sent to an address with no live listener.
    #[error("destination address {0} not found")]
    UnknownAddress(Address),

    /// A message reached a handler whose address does not match the
    /// header's destination.
    #[error("{address} received message destined for {dst}")]
    WrongDestination { address: Address, dst: Address },

    /// Delivery would re-enter a handler that is already running on the
    /// current call stack. The fan-out topology is expected to be
    /// star-shaped; a cycle is a caller bug, not a retryable condition.
    #[error("delivery to {0} would re-enter a handler already on the call stack")]
    ReentrantDelivery(Address),

    /// An entity was attached to a transport endpoint twice.
    #[error("entity {0} is already attached to a transport")]
    AlreadyAttached(Address),

    /// A negotiation was started on an entity that has no endpoint yet.
    #[error("entity {0} is not attached to a transport")]
    NotAttached(Address),

    /// The negotiation loop exceeded its iteration bound without clearing
    /// all overlaps.
    #[error("stuck in negotiation loop after {iterations} iterations (bound {bound})")]
    NegotiationStuck { iterations: u32, bound: u32 },

    /// The message itself was malformed.
    #[error(transparent)]
    Message(#[from] MessageError),

    /// A payload could not be converted to or from its JSON form: a reply
    /// that does not hold the expected shape, or a local value that cannot
    /// be exposed to query evaluation.
    #[error("payload conversion failed: {0}")]
    Payload(#[from] serde_json::Error),
}
