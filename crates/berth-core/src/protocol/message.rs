//! Envelope types for peer-to-peer entity messages.
//!
//! A [`Message`] is what one entity hands to the transport for delivery to
//! another. Apart from the header (stamped by the transport at send time,
//! never by the caller) every field is optional: a message can carry a query,
//! a batch of queries, consideration hints, a shift request, or any mix of
//! them. The one combination that is never valid is `query` together with
//! `queries`; receivers reject it so the sender observes the failure instead
//! of a silent default reply.
//!
//! The constructors below only produce valid messages. The fields stay
//! public so tests (and future transports that parse envelopes off a wire)
//! can build arbitrary shapes and run them through [`Message::validate`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::query::Expr;

/// Errors in the shape of a message, detected by the receiver.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MessageError {
    /// Both `query` and `queries` were set; they are mutually exclusive.
    #[error("may only include one of `query` or `queries` in a message")]
    AmbiguousQuery,

    /// The message reached a handler without a header. Handlers are only
    /// ever invoked by the transport, which always stamps one.
    #[error("message delivered without a header")]
    MissingHeader,
}

/// A process-unique identifier an entity listens on.
///
/// Addresses are opaque strings chosen by the caller at bind time and never
/// change for the lifetime of the entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

/// Routing header, stamped onto the message by the transport at send time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Address of the sender.
    pub src: Address,
    /// Address of the receiver.
    pub dst: Address,
}

/// A translation the sender wants the receiver to apply to itself.
///
/// Positive `right` moves toward larger `left` coordinates, positive `down`
/// toward larger `top`. The receiver applies the shift unconditionally.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Shift {
    pub right: f64,
    pub down: f64,
}

/// The actions a message can request of the receiver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Translate the receiver's own rectangle by the given deltas.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shift: Option<Shift>,
}

/// The envelope exchanged between entities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Set by the transport when the message is sent; `None` until then.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<Header>,

    /// A single expression for the receiver to evaluate and reply with.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<Expr>,

    /// An ordered batch of expressions; the reply preserves their order.
    /// Mutually exclusive with `query`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queries: Option<Vec<Expr>>,

    /// Out-of-band hints the sender wants the receiver to remember, keyed
    /// by a sender-chosen id. Receivers keep the first payload seen per id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub considerations: Option<BTreeMap<String, Value>>,

    /// Actions requested of the receiver.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<Request>,
}

impl Message {
    /// An empty message. The receiver answers it with a bare acknowledgment.
    pub fn new() -> Self {
        Self::default()
    }

    /// A message carrying a single query.
    pub fn query(expr: Expr) -> Self {
        Self {
            query: Some(expr),
            ..Self::default()
        }
    }

    /// A message carrying an ordered batch of queries.
    pub fn queries(exprs: Vec<Expr>) -> Self {
        Self {
            queries: Some(exprs),
            ..Self::default()
        }
    }

    /// A message asking the receiver to shift itself by `(right, down)`.
    pub fn shift_request(right: f64, down: f64) -> Self {
        Self {
            request: Some(Request {
                shift: Some(Shift { right, down }),
            }),
            ..Self::default()
        }
    }

    /// Attaches a single query, replacing any previous one.
    pub fn and_query(mut self, expr: Expr) -> Self {
        self.query = Some(expr);
        self
    }

    /// Adds a consideration under `id`.
    pub fn and_consideration(mut self, id: impl Into<String>, value: Value) -> Self {
        self.considerations
            .get_or_insert_with(BTreeMap::new)
            .insert(id.into(), value);
        self
    }

    /// Checks the mutual-exclusion contract between `query` and `queries`.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::AmbiguousQuery`] when both are set.
    pub fn validate(&self) -> Result<(), MessageError> {
        if self.query.is_some() && self.queries.is_some() {
            return Err(MessageError::AmbiguousQuery);
        }
        Ok(())
    }
}

/// A reply synthesized by the transport when a handler returns a value.
///
/// The header is the request header with `src` and `dst` swapped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub header: Header,
    pub data: Value,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
