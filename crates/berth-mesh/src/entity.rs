//! The addressable participant: identity, occupied rectangle, and the
//! inbound message contract.
//!
//! An entity owns its rectangle exclusively. Peers never reach into it;
//! they send queries (answered from a context the entity chooses to
//! expose) and shift requests (which the entity applies to itself,
//! unconditionally). The handler below is the entire inbound surface.

use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use berth_core::{evaluate, Address, Context, Message, MessageError, Rect, Store};

use crate::error::MeshError;
use crate::surface::Surface;
use crate::transport::{Endpoint, MessageHandler};

/// Store collection holding consideration records.
const CONSIDERATIONS: &str = "considerations";

/// A participant in the mesh.
pub struct Entity {
    id: Uuid,
    address: Address,
    surface: Box<dyn Surface>,
    stores: Store,
    endpoint: Option<Endpoint>,
}

impl Entity {
    /// Creates an entity at `address` over the given surface.
    ///
    /// The address is permanent: there is no way to change it later, and
    /// [`attach`](Self::attach) refuses a second endpoint.
    pub fn new(address: Address, surface: Box<dyn Surface>) -> Self {
        Self {
            id: Uuid::new_v4(),
            address,
            surface,
            stores: Store::new(),
            endpoint: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    /// The entity's own box.
    pub fn rectangle(&self) -> Rect {
        self.surface.rectangle()
    }

    /// The own box unioned with any substructure the surface owns.
    pub fn bounding_rectangle(&self) -> Rect {
        self.surface.bounding_rectangle()
    }

    /// Moves the entity to an absolute position.
    pub fn move_to(&mut self, left: f64, top: f64) {
        self.surface.move_to(left, top);
    }

    /// Stores the send handle obtained when this entity was bound.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::AlreadyAttached`] when an endpoint is already
    /// present; entities keep their first binding for life.
    pub fn attach(&mut self, endpoint: Endpoint) -> Result<(), MeshError> {
        if self.endpoint.is_some() {
            return Err(MeshError::AlreadyAttached(self.address.clone()));
        }
        self.endpoint = Some(endpoint);
        Ok(())
    }

    /// The send handle, if this entity has been bound to a transport.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::NotAttached`] before [`attach`](Self::attach)
    /// has been called.
    pub fn endpoint(&self) -> Result<&Endpoint, MeshError> {
        self.endpoint
            .as_ref()
            .ok_or_else(|| MeshError::NotAttached(self.address.clone()))
    }

    /// The consideration stored under `id`, if any.
    pub fn consideration(&self, id: &str) -> Option<&Value> {
        self.stores.get(CONSIDERATIONS, id)
    }

    /// The context queries are evaluated against: the entity exposes its
    /// own rectangle as `offset` and its bounding rectangle as `bounds`.
    fn query_context(&self) -> Result<Context, MeshError> {
        Ok(Context::new()
            .with("offset", serde_json::to_value(self.rectangle())?)
            .with("bounds", serde_json::to_value(self.bounding_rectangle())?))
    }
}

impl MessageHandler for Entity {
    /// Processes one inbound message, in contract order:
    ///
    /// 1. destination check (fatal on mismatch; the sender sees the error),
    /// 2. consideration ingestion (first payload per id wins),
    /// 3. shift request (applied unconditionally),
    /// 4. `query`/`queries` mutual-exclusion check,
    /// 5. query evaluation against the local context,
    /// 6. bare `true` acknowledgment when nothing else produced a reply.
    ///
    /// A shift is applied *before* queries are evaluated, so a message
    /// carrying both gets answers that reflect the new position. It is also
    /// applied before the mutual-exclusion check, matching the step order
    /// above: validation guards the reply, not the request.
    fn handle_message(&mut self, msg: &Message) -> Result<Option<Value>, MeshError> {
        let header = msg.header.as_ref().ok_or(MessageError::MissingHeader)?;
        if header.dst != self.address {
            return Err(MeshError::WrongDestination {
                address: self.address.clone(),
                dst: header.dst.clone(),
            });
        }

        if let Some(considerations) = &msg.considerations {
            for (id, payload) in considerations {
                if !self.stores.has(CONSIDERATIONS, id) {
                    debug!(target: "considerations", entity = %self.address, id = %id, "storing consideration");
                    self.stores.set(CONSIDERATIONS, id, payload.clone());
                }
            }
        }

        if let Some(shift) = msg.request.as_ref().and_then(|r| r.shift) {
            let rect = self.rectangle();
            debug!(
                target: "positioning",
                entity = %self.address,
                right = shift.right,
                down = shift.down,
                "applying shift request"
            );
            self.surface
                .move_to(rect.left + shift.right, rect.top + shift.down);
        }

        msg.validate()?;

        if let Some(query) = &msg.query {
            let context = self.query_context()?;
            return Ok(Some(evaluate(query, &context)));
        }
        if let Some(queries) = &msg.queries {
            let context = self.query_context()?;
            let results = queries.iter().map(|q| evaluate(q, &context)).collect();
            return Ok(Some(Value::Array(results)));
        }

        // Nothing above replied; acknowledge receipt.
        Ok(Some(Value::Bool(true)))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use berth_core::{Expr, Header};
    use serde_json::json;

    fn make_entity(address: &str, rect: Rect) -> Entity {
        Entity::new(
            Address::new(address),
            Box::new(crate::surface::PanelSurface::new(rect)),
        )
    }

    /// Stamps a header the way the transport would.
    fn addressed_to(entity: &Entity, msg: Message) -> Message {
        Message {
            header: Some(Header {
                src: Address::new("peer"),
                dst: entity.address().clone(),
            }),
            ..msg
        }
    }

    // ── Destination check ─────────────────────────────────────────────────────

    #[test]
    fn test_message_without_header_is_rejected() {
        let mut entity = make_entity("a", Rect::new(0.0, 0.0, 5.0, 5.0));
        let result = entity.handle_message(&Message::new());
        assert!(matches!(
            result,
            Err(MeshError::Message(MessageError::MissingHeader))
        ));
    }

    #[test]
    fn test_message_for_another_destination_is_rejected() {
        let mut entity = make_entity("a", Rect::new(0.0, 0.0, 5.0, 5.0));
        let msg = Message {
            header: Some(Header {
                src: Address::new("peer"),
                dst: Address::new("someone-else"),
            }),
            ..Message::new()
        };
        let result = entity.handle_message(&msg);
        assert!(matches!(result, Err(MeshError::WrongDestination { .. })));
    }

    // ── Considerations ────────────────────────────────────────────────────────

    #[test]
    fn test_considerations_are_stored_verbatim() {
        let mut entity = make_entity("a", Rect::new(0.0, 0.0, 5.0, 5.0));
        let msg = addressed_to(
            &entity,
            Message::new().and_consideration("lease", json!({"ttl": 30})),
        );

        entity.handle_message(&msg).expect("handled");

        assert_eq!(entity.consideration("lease"), Some(&json!({"ttl": 30})));
    }

    #[test]
    fn test_repeated_consideration_id_keeps_first_payload() {
        let mut entity = make_entity("a", Rect::new(0.0, 0.0, 5.0, 5.0));
        let first = addressed_to(&entity, Message::new().and_consideration("lease", json!(1)));
        let second = addressed_to(&entity, Message::new().and_consideration("lease", json!(2)));

        entity.handle_message(&first).expect("handled");
        entity.handle_message(&second).expect("handled");

        assert_eq!(entity.consideration("lease"), Some(&json!(1)));
    }

    // ── Shift requests ────────────────────────────────────────────────────────

    #[test]
    fn test_shift_request_translates_the_rectangle() {
        let mut entity = make_entity("a", Rect::new(10.0, 0.0, 5.0, 5.0));
        let msg = addressed_to(&entity, Message::shift_request(3.0, 0.0));

        entity.handle_message(&msg).expect("handled");

        assert_eq!(entity.rectangle(), Rect::new(13.0, 0.0, 5.0, 5.0));
    }

    #[test]
    fn test_shift_reply_is_a_bare_ack_without_a_query() {
        let mut entity = make_entity("a", Rect::new(10.0, 0.0, 5.0, 5.0));
        let msg = addressed_to(&entity, Message::shift_request(3.0, 0.0));

        let reply = entity.handle_message(&msg).expect("handled");

        assert_eq!(reply, Some(json!(true)));
    }

    #[test]
    fn test_offset_query_in_a_shift_message_sees_the_new_position() {
        let mut entity = make_entity("a", Rect::new(10.0, 0.0, 5.0, 5.0));
        let msg = addressed_to(
            &entity,
            Message::shift_request(3.0, 0.0).and_query(Expr::var("offset")),
        );

        let reply = entity.handle_message(&msg).expect("handled").expect("reply");

        let offset: Rect = serde_json::from_value(reply).expect("offset is a rect");
        assert_eq!(offset, Rect::new(13.0, 0.0, 5.0, 5.0));
    }

    // ── Query handling ────────────────────────────────────────────────────────

    #[test]
    fn test_query_and_queries_together_are_rejected() {
        let mut entity = make_entity("a", Rect::new(0.0, 0.0, 5.0, 5.0));
        let msg = addressed_to(
            &entity,
            Message {
                query: Some(Expr::var("offset")),
                queries: Some(vec![Expr::var("bounds")]),
                ..Message::default()
            },
        );

        let result = entity.handle_message(&msg);

        assert!(matches!(
            result,
            Err(MeshError::Message(MessageError::AmbiguousQuery))
        ));
    }

    #[test]
    fn test_shift_still_applies_when_the_query_shape_is_invalid() {
        // Validation guards the reply, not the request: the malformed query
        // combination fails the call only after the shift has been applied.
        let mut entity = make_entity("a", Rect::new(10.0, 0.0, 5.0, 5.0));
        let mut msg = Message::shift_request(3.0, 0.0);
        msg.query = Some(Expr::var("offset"));
        msg.queries = Some(vec![Expr::var("bounds")]);
        let msg = addressed_to(&entity, msg);

        let result = entity.handle_message(&msg);

        assert!(result.is_err());
        assert_eq!(entity.rectangle(), Rect::new(13.0, 0.0, 5.0, 5.0));
    }

    #[test]
    fn test_single_query_returns_the_evaluated_value() {
        let mut entity = make_entity("a", Rect::new(10.0, 0.0, 5.0, 5.0));
        let msg = addressed_to(&entity, Message::query(Expr::var("offset")));

        let reply = entity.handle_message(&msg).expect("handled").expect("reply");

        let offset: Rect = serde_json::from_value(reply).expect("offset is a rect");
        assert_eq!(offset, Rect::new(10.0, 0.0, 5.0, 5.0));
    }

    #[test]
    fn test_batch_queries_return_results_in_order() {
        let surface = crate::surface::PanelSurface::new(Rect::new(10.0, 0.0, 5.0, 5.0))
            .with_child(Rect::new(5.0, 0.0, 3.0, 3.0));
        let mut entity = Entity::new(Address::new("a"), Box::new(surface));
        let msg = addressed_to(
            &entity,
            Message::queries(vec![Expr::var("bounds"), Expr::var("offset")]),
        );

        let reply = entity.handle_message(&msg).expect("handled").expect("reply");

        let results = reply.as_array().expect("batch reply is an array");
        assert_eq!(results.len(), 2);
        let bounds: Rect = serde_json::from_value(results[0].clone()).expect("bounds");
        let offset: Rect = serde_json::from_value(results[1].clone()).expect("offset");
        assert_eq!(bounds, Rect::new(10.0, 0.0, 8.0, 5.0));
        assert_eq!(offset, Rect::new(10.0, 0.0, 5.0, 5.0));
    }

    #[test]
    fn test_unknown_variable_evaluates_to_null_not_an_error() {
        let mut entity = make_entity("a", Rect::new(0.0, 0.0, 5.0, 5.0));
        let msg = addressed_to(&entity, Message::query(Expr::var("velocity")));

        let reply = entity.handle_message(&msg).expect("handled");

        assert_eq!(reply, Some(Value::Null));
    }

    #[test]
    fn test_plain_message_is_acknowledged_with_true() {
        let mut entity = make_entity("a", Rect::new(0.0, 0.0, 5.0, 5.0));
        let msg = addressed_to(&entity, Message::new());

        let reply = entity.handle_message(&msg).expect("handled");

        assert_eq!(reply, Some(json!(true)));
    }

    // ── Attachment ────────────────────────────────────────────────────────────

    #[test]
    fn test_endpoint_is_unavailable_before_attach() {
        let entity = make_entity("a", Rect::new(0.0, 0.0, 5.0, 5.0));
        assert!(matches!(entity.endpoint(), Err(MeshError::NotAttached(_))));
    }
}
