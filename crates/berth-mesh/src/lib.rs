//! # berth-mesh
//!
//! The Berth runtime: a process-local addressed transport, the entities
//! that listen on it, and the overlap-avoidance negotiation that runs over
//! it.
//!
//! Everything here is single-threaded and synchronous by design. A `send`
//! is a direct call into the destination handler, which gives the
//! negotiation its ordering guarantees: surveys and shift requests reach
//! peers strictly in discovery order, one completing before the next
//! begins. Modeling the transport as anything asynchronous would change
//! those guarantees, so it deliberately is not.
//!
//! Module map:
//!
//! - **`transport`** – address registry, bind, synchronous send/reply.
//! - **`entity`** – the addressable participant and its inbound contract.
//! - **`negotiation`** – `avoid_all_others` and the shift sub-protocol.
//! - **`surface`** – the boundary to whatever renders an entity.
//! - **`mesh`** – composition root that wires entities to the transport.
//! - **`config`** – TOML configuration for the demo runtime.
//! - **`error`** – the crate-wide error taxonomy.

pub mod config;
pub mod entity;
pub mod error;
pub mod mesh;
pub mod negotiation;
pub mod surface;
pub mod transport;

pub use entity::Entity;
pub use error::MeshError;
pub use mesh::Mesh;
pub use negotiation::{
    NegotiationPolicy, NegotiationReport, RandomSide, SideChooser, TargetSide,
};
pub use surface::{PanelSurface, Surface};
pub use transport::{Endpoint, MessageHandler, SharedHandler, Transport};
