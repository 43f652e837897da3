//! Integration tests for the transport and the entity message contract.
//!
//! These tests drive full entities through the public API (mesh
//! registration, addressed delivery, replies) rather than poking handler
//! internals. Custom handlers appear only where the contract is about
//! non-entity listeners (reply suppression).

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::{json, Value};

use berth_core::{Address, Expr, Message, MessageError, Rect};
use berth_mesh::{Entity, Mesh, MeshError, MessageHandler, PanelSurface, SharedHandler};

fn make_entity(address: &str, rect: Rect) -> Entity {
    Entity::new(Address::new(address), Box::new(PanelSurface::new(rect)))
}

fn make_mesh_of_two() -> (Mesh, Rc<RefCell<Entity>>, Rc<RefCell<Entity>>) {
    let mut mesh = Mesh::new();
    let a = mesh
        .add_entity(make_entity("a", Rect::new(0.0, 0.0, 10.0, 10.0)))
        .expect("a registers");
    let b = mesh
        .add_entity(make_entity("b", Rect::new(20.0, 0.0, 10.0, 10.0)))
        .expect("b registers");
    (mesh, a, b)
}

// ── Bind uniqueness ───────────────────────────────────────────────────────────

#[test]
fn test_second_bind_to_same_address_fails_and_original_stays_authoritative() {
    let (mut mesh, a, _b) = make_mesh_of_two();

    let result = mesh.add_entity(make_entity("b", Rect::new(50.0, 0.0, 5.0, 5.0)));
    assert!(matches!(result, Err(MeshError::DuplicateAddress(_))));

    // The original listener at "b" still answers.
    let mut reply = None;
    a.borrow()
        .endpoint()
        .expect("attached")
        .send(
            &Address::new("b"),
            Message::query(Expr::var("offset")),
            |r| reply = Some(r),
        )
        .expect("send succeeds");
    let offset: Rect =
        serde_json::from_value(reply.expect("reply").data).expect("offset is a rect");
    assert_eq!(offset, Rect::new(20.0, 0.0, 10.0, 10.0));
}

// ── Routing correctness ───────────────────────────────────────────────────────

#[test]
fn test_send_reaches_only_the_addressed_entity() {
    let (mut mesh, a, b) = make_mesh_of_two();
    let c = mesh
        .add_entity(make_entity("c", Rect::new(40.0, 0.0, 10.0, 10.0)))
        .expect("c registers");

    // a asks b to shift; only b moves.
    a.borrow()
        .request_other_to_shift(&Address::new("b"), 5.0, 0.0, |_| {})
        .expect("shift request succeeds");

    assert_eq!(b.borrow().rectangle().left, 25.0);
    assert_eq!(c.borrow().rectangle().left, 40.0, "c must be untouched");
    assert_eq!(a.borrow().rectangle().left, 0.0);
}

#[test]
fn test_reply_header_identifies_the_answering_peer() {
    let (_mesh, a, _b) = make_mesh_of_two();

    let mut reply = None;
    a.borrow()
        .endpoint()
        .expect("attached")
        .send(&Address::new("b"), Message::new(), |r| reply = Some(r))
        .expect("send succeeds");

    let reply = reply.expect("entities always acknowledge");
    assert_eq!(reply.header.src, Address::new("b"));
    assert_eq!(reply.header.dst, Address::new("a"));
}

#[test]
fn test_send_to_unknown_address_fails() {
    let (_mesh, a, _b) = make_mesh_of_two();

    let result = a.borrow().endpoint().expect("attached").send(
        &Address::new("ghost"),
        Message::new(),
        |_| {},
    );

    assert!(matches!(result, Err(MeshError::UnknownAddress(_))));
}

// ── Reply suppression ─────────────────────────────────────────────────────────

#[test]
fn test_handler_returning_nothing_never_triggers_the_reply_callback() {
    /// A listener that accepts every message and never answers.
    struct SilentSink;

    impl MessageHandler for SilentSink {
        fn handle_message(&mut self, _msg: &Message) -> Result<Option<Value>, MeshError> {
            Ok(None)
        }
    }

    let (mesh, a, _b) = make_mesh_of_two();
    let sink: SharedHandler = Rc::new(RefCell::new(SilentSink));
    mesh.transport()
        .bind(Address::new("sink"), &sink)
        .expect("sink binds");

    let mut reply_count = 0;
    a.borrow()
        .endpoint()
        .expect("attached")
        .send(&Address::new("sink"), Message::new(), |_| reply_count += 1)
        .expect("send succeeds");

    assert_eq!(reply_count, 0, "no handler value, no reply");
}

// ── Considerations ────────────────────────────────────────────────────────────

#[test]
fn test_considerations_ingest_idempotently_across_the_transport() {
    let (_mesh, a, b) = make_mesh_of_two();

    let first = Message::new().and_consideration("claim", json!({"rank": 1}));
    let second = Message::new().and_consideration("claim", json!({"rank": 99}));
    let endpoint = a.borrow();
    let endpoint = endpoint.endpoint().expect("attached");
    endpoint
        .send(&Address::new("b"), first, |_| {})
        .expect("first send");
    endpoint
        .send(&Address::new("b"), second, |_| {})
        .expect("second send");

    assert_eq!(
        b.borrow().consideration("claim"),
        Some(&json!({"rank": 1})),
        "first payload wins; later payloads for the same id are ignored"
    );
}

// ── Query mutual exclusion ────────────────────────────────────────────────────

#[test]
fn test_ambiguous_query_message_fails_the_send_not_silently() {
    let (_mesh, a, _b) = make_mesh_of_two();

    let bad = Message {
        query: Some(Expr::var("offset")),
        queries: Some(vec![Expr::var("bounds")]),
        ..Message::default()
    };
    let mut reply_count = 0;
    let result = a.borrow().endpoint().expect("attached").send(
        &Address::new("b"),
        bad,
        |_| reply_count += 1,
    );

    assert!(matches!(
        result,
        Err(MeshError::Message(MessageError::AmbiguousQuery))
    ));
    assert_eq!(reply_count, 0, "the sender observes a failure, not a reply");
}

// ── Shift correctness ─────────────────────────────────────────────────────────

#[test]
fn test_shift_request_moves_peer_and_reply_reflects_new_position() {
    let mut mesh = Mesh::new();
    let a = mesh
        .add_entity(make_entity("a", Rect::new(0.0, 0.0, 5.0, 5.0)))
        .expect("a registers");
    let e = mesh
        .add_entity(make_entity("e", Rect::new(10.0, 0.0, 5.0, 5.0)))
        .expect("e registers");

    let mut reported = None;
    a.borrow()
        .request_other_to_shift(&Address::new("e"), 3.0, 0.0, |response| {
            reported = Some(response.data)
        })
        .expect("shift request succeeds");

    assert_eq!(e.borrow().rectangle(), Rect::new(13.0, 0.0, 5.0, 5.0));
    let reported: Rect =
        serde_json::from_value(reported.expect("reply")).expect("offset is a rect");
    assert_eq!(
        reported,
        Rect::new(13.0, 0.0, 5.0, 5.0),
        "the reply's offset already reflects the applied shift"
    );
}

#[test]
fn test_shift_fan_out_reaches_peers_in_bind_order() {
    /// Records the order shift requests arrive in, then answers like a
    /// well-behaved panel.
    struct OrderProbe {
        name: &'static str,
        rect: Rect,
        log: Rc<RefCell<Vec<&'static str>>>,
    }

    impl MessageHandler for OrderProbe {
        fn handle_message(&mut self, msg: &Message) -> Result<Option<Value>, MeshError> {
            if let Some(shift) = msg.request.as_ref().and_then(|r| r.shift) {
                self.log.borrow_mut().push(self.name);
                self.rect = self.rect.translate(shift.right, shift.down);
            }
            if msg.query.is_some() {
                return Ok(Some(serde_json::to_value(self.rect)?));
            }
            Ok(Some(json!(true)))
        }
    }

    let mut mesh = Mesh::new();
    let a = mesh
        .add_entity(make_entity("a", Rect::new(0.0, 0.0, 5.0, 5.0)))
        .expect("a registers");

    let log = Rc::new(RefCell::new(Vec::new()));
    // The registry holds listeners weakly; the probes live here.
    let mut probes = Vec::new();
    for (name, left) in [("first", 10.0), ("second", 20.0), ("third", 30.0)] {
        let probe: SharedHandler = Rc::new(RefCell::new(OrderProbe {
            name,
            rect: Rect::new(left, 0.0, 5.0, 5.0),
            log: Rc::clone(&log),
        }));
        mesh.transport()
            .bind(Address::new(name), &probe)
            .expect("probe binds");
        probes.push(probe);
    }

    a.borrow()
        .request_all_others_to_shift(1.0, 0.0, |_| {})
        .expect("fan-out succeeds");

    assert_eq!(*log.borrow(), vec!["first", "second", "third"]);
}
