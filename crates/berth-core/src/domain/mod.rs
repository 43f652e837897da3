//! Domain primitives shared by every entity.
//!
//! This module has no dependency on the transport or on any runtime
//! concern; it can be compiled and tested in isolation. It holds the two
//! things an entity reasons about locally: the geometry of rectangular
//! regions and a small store for remembered values.

pub mod geometry;
pub mod store;
