//! Composition root: wires entities to the transport.
//!
//! The mesh owns the transport and every entity registered with it. For
//! each entity it performs the registration handshake exactly once: bind
//! the entity's handler under its address, then hand the returned send
//! handle back to the entity, before any negotiation can run on it.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;
use uuid::Uuid;

use berth_core::Address;

use crate::entity::Entity;
use crate::error::MeshError;
use crate::transport::{SharedHandler, Transport};

/// A mesh of entities sharing one process-local transport.
pub struct Mesh {
    transport: Rc<Transport>,
    entities: HashMap<Uuid, Rc<RefCell<Entity>>>,
}

impl Mesh {
    pub fn new() -> Self {
        Self {
            transport: Transport::new(),
            entities: HashMap::new(),
        }
    }

    /// The shared transport, mainly useful for binding non-entity
    /// listeners (test fixtures, monitors) into the same address space.
    pub fn transport(&self) -> &Rc<Transport> {
        &self.transport
    }

    /// Registers `entity` with the transport under its own address and
    /// attaches the resulting send handle.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::DuplicateAddress`] when the address is taken;
    /// the entity is not registered in that case.
    pub fn add_entity(&mut self, entity: Entity) -> Result<Rc<RefCell<Entity>>, MeshError> {
        let address = entity.address().clone();
        let id = entity.id();

        let entity = Rc::new(RefCell::new(entity));
        let handler: SharedHandler = entity.clone();
        let endpoint = self.transport.bind(address.clone(), &handler)?;
        entity.borrow_mut().attach(endpoint)?;

        debug!(target: "transport", %address, "entity joined mesh");
        self.entities.insert(id, Rc::clone(&entity));
        Ok(entity)
    }

    /// Looks an entity up by id.
    pub fn entity(&self, id: Uuid) -> Option<Rc<RefCell<Entity>>> {
        self.entities.get(&id).cloned()
    }

    /// Looks an entity up by address.
    pub fn entity_at(&self, address: &Address) -> Option<Rc<RefCell<Entity>>> {
        self.entities
            .values()
            .find(|e| e.borrow().address() == address)
            .cloned()
    }

    /// Number of registered entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
