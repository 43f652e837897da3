//! # berth-core
//!
//! Shared library for Berth containing the peer message protocol, domain
//! geometry, and the query expression evaluator.
//!
//! Berth coordinates the positions of independent rectangular entities so
//! that none overlaps another, using nothing but peer-to-peer message
//! exchange: there is no shared global state and no central coordinator.
//! Each entity knows only its own geometry and learns about others by
//! querying them over an addressed transport.
//!
//! This crate is the runtime-free foundation. It defines:
//!
//! - **`protocol`** – The message envelope entities exchange: addresses,
//!   headers, queries, considerations, and shift requests.
//!
//! - **`domain`** – Pure spatial logic with no transport dependencies:
//!   rectangle intersection and union, plus the collection-keyed store
//!   entities use for remembered values.
//!
//! - **`query`** – The tiny declarative expression language receivers
//!   evaluate against their local context (`offset`, `bounds`) to answer
//!   queries without exposing state directly.

pub mod domain;
pub mod protocol;
pub mod query;

// Re-export the most-used types at the crate root so callers can write
// `berth_core::Message` instead of `berth_core::protocol::message::Message`.
pub use domain::geometry::{bounding_box, Point, Rect};
pub use domain::store::Store;
pub use protocol::message::{
    Address, Header, Message, MessageError, Request, Response, Shift,
};
pub use query::{evaluate, Context, Expr};
