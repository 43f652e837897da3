//! Process-local addressed transport with synchronous request/reply.
//!
//! The transport is a registry of listeners keyed by [`Address`]. Delivery
//! is a direct call: `send` looks up the destination handler, stamps the
//! routing header, and invokes the handler on the caller's stack. There is
//! no queuing and no retry; the ordering guarantees the negotiation
//! protocol depends on fall directly out of call/return.
//!
//! Because delivery is a direct call, a handler may itself call `send` and
//! nest synchronously into another handler. Delivery back into a handler
//! that is already running on the current stack is refused with
//! [`MeshError::ReentrantDelivery`] rather than recursing without bound;
//! the expected topology is star-shaped (an entity fans out to its peers,
//! peers do not call back into it within the same round).
//!
//! A reply exists only when the handler returns a value. A handler that
//! returns `None` produces no reply and the sender's callback never runs;
//! there is no implicit acknowledgment at this layer.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use serde_json::Value;
use tracing::{debug, trace};

use berth_core::{Address, Header, Message, Response};

use crate::error::MeshError;

/// The inbound contract a listener implements.
pub trait MessageHandler {
    /// Processes one inbound message.
    ///
    /// Returning `Ok(Some(data))` makes the transport synthesize a
    /// [`Response`] for the sender; `Ok(None)` suppresses the reply.
    ///
    /// # Errors
    ///
    /// Any error is propagated to the sender as the outcome of its `send`
    /// call; no reply is synthesized.
    fn handle_message(&mut self, msg: &Message) -> Result<Option<Value>, MeshError>;
}

/// A handler shared with the transport.
///
/// Handlers are single-threaded; `Rc<RefCell<..>>` gives the transport a
/// way to reach them while the mesh retains ownership. The `RefCell` borrow
/// doubles as the re-entrancy guard during delivery.
pub type SharedHandler = Rc<RefCell<dyn MessageHandler>>;

struct Binding {
    address: Address,
    /// Weak so the registry never keeps an entity alive; a dropped listener
    /// shows up as an unknown address at send time.
    handler: Weak<RefCell<dyn MessageHandler>>,
}

/// The process-local address registry.
#[derive(Default)]
pub struct Transport {
    bindings: RefCell<Vec<Binding>>,
}

impl Transport {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Registers `handler` under `address` and returns the send handle the
    /// listener will use for its own outbound traffic.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::DuplicateAddress`] when `address` already has a
    /// listener; the original listener remains authoritative.
    pub fn bind(
        self: &Rc<Self>,
        address: Address,
        handler: &SharedHandler,
    ) -> Result<Endpoint, MeshError> {
        let mut bindings = self.bindings.borrow_mut();
        if bindings.iter().any(|b| b.address == address) {
            return Err(MeshError::DuplicateAddress(address));
        }
        debug!(target: "transport", %address, "binding listener");
        bindings.push(Binding {
            address: address.clone(),
            handler: Rc::downgrade(handler),
        });
        Ok(Endpoint {
            address,
            transport: Rc::clone(self),
        })
    }

    /// All currently bound addresses, in bind order.
    pub fn list(&self) -> Vec<Address> {
        self.bindings
            .borrow()
            .iter()
            .map(|b| b.address.clone())
            .collect()
    }

    fn find(&self, address: &Address) -> Option<Weak<RefCell<dyn MessageHandler>>> {
        self.bindings
            .borrow()
            .iter()
            .find(|b| b.address == *address)
            .map(|b| b.handler.clone())
    }
}

/// The send handle returned by [`Transport::bind`].
///
/// Messages sent through an endpoint carry its address as `header.src`.
pub struct Endpoint {
    address: Address,
    transport: Rc<Transport>,
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl Endpoint {
    /// The address this endpoint was bound under.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// All currently bound addresses, in bind order (including this one).
    pub fn list(&self) -> Vec<Address> {
        self.transport.list()
    }

    /// Delivers `msg` to the listener bound at `dst`, synchronously.
    ///
    /// The header is stamped here; whatever the caller put in `msg.header`
    /// is overwritten. If the handler returns a value, `on_reply` is
    /// invoked with a [`Response`] whose header has `src`/`dst` swapped;
    /// if the handler returns no value, `on_reply` never runs.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::UnknownAddress`] when no listener is bound at
    /// `dst` (or its entity has been dropped), [`MeshError::ReentrantDelivery`]
    /// when `dst`'s handler is already executing on this call stack, and
    /// any error the handler itself produced.
    pub fn send(
        &self,
        dst: &Address,
        msg: Message,
        on_reply: impl FnOnce(Response),
    ) -> Result<(), MeshError> {
        // Resolve the listener first and let the registry borrow end before
        // dispatch, so the handler is free to send while it runs.
        let handler = self
            .transport
            .find(dst)
            .and_then(|weak| weak.upgrade())
            .ok_or_else(|| MeshError::UnknownAddress(dst.clone()))?;

        let mut msg = msg;
        msg.header = Some(Header {
            src: self.address.clone(),
            dst: dst.clone(),
        });
        trace!(target: "transport", src = %self.address, dst = %dst, "delivering");

        let data = {
            let mut guard = handler
                .try_borrow_mut()
                .map_err(|_| MeshError::ReentrantDelivery(dst.clone()))?;
            guard.handle_message(&msg)?
        };

        if let Some(data) = data {
            on_reply(Response {
                header: Header {
                    src: dst.clone(),
                    dst: self.address.clone(),
                },
                data,
            });
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
