//! End-to-end scenario tests against an in-memory mock transport.
//!
//! Each test drives `Session::apply` directly rather than `Session::run`:
//! a trigger goes in, a frame comes out, with no need to round-trip
//! through a fake socket's `recv()` loop to exercise the same code path.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::mpsc;

use crate::codec::JsonCodec;
use crate::common::ClientRole;
use crate::events::{CallOutcome, CalleeEvent, CallerEvent, PublicationEvent, SubscriptionEvent};
use crate::id::IdAllocator;
use crate::message::{WampDict, WampId};
use crate::transport::{Transport, TransportError, TransportEvent};

use super::{NullListener, Session, SessionState, Trigger};

#[derive(Default)]
struct MockTransport {
    sent: Arc<Mutex<Vec<String>>>,
    closed: Arc<Mutex<Option<(u16, String)>>>,
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, text: &str) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn close(&mut self, code: u16, reason: Option<String>) -> Result<(), TransportError> {
        *self.closed.lock().unwrap() = Some((code, reason.unwrap_or_default()));
        Ok(())
    }

    async fn recv(&mut self) -> TransportEvent {
        std::future::pending().await
    }
}

/// Hands out ids from a fixed script, exactly as the allocator would if it
/// happened to draw those values — lets scenario tests match the exact
/// wire payloads below without depending on `rand`.
struct ScriptedIdAllocator {
    script: Vec<WampId>,
}

impl IdAllocator for ScriptedIdAllocator {
    fn new_id(&mut self) -> WampId {
        assert!(!self.script.is_empty(), "scripted allocator ran out of ids");
        self.script.remove(0)
    }
    fn release_id(&mut self, _id: WampId) {}
}

fn dict(v: serde_json::Value) -> WampDict {
    match v {
        serde_json::Value::Object(m) => m,
        _ => panic!("expected object"),
    }
}

struct Harness {
    session: Session,
    sent: Arc<Mutex<Vec<String>>>,
    closed: Arc<Mutex<Option<(u16, String)>>>,
    ctl_rx: mpsc::UnboundedReceiver<Trigger>,
}

fn harness(ids: Vec<WampId>) -> Harness {
    let sent = Arc::new(Mutex::new(Vec::new()));
    let closed = Arc::new(Mutex::new(None));
    let transport = MockTransport {
        sent: sent.clone(),
        closed: closed.clone(),
    };
    let (ctl_tx, ctl_rx) = mpsc::unbounded_channel();
    let roles = [
        ClientRole::Publisher,
        ClientRole::Subscriber,
        ClientRole::Caller,
        ClientRole::Callee,
    ]
    .iter()
    .cloned()
    .collect();

    let session = Session::new(
        Box::new(transport),
        Box::new(JsonCodec),
        Box::new(ScriptedIdAllocator { script: ids }),
        roles,
        None,
        Box::new(NullListener),
        ctl_tx,
    );

    Harness {
        session,
        sent,
        closed,
        ctl_rx,
    }
}

async fn join(h: &mut Harness, session_id: WampId) {
    h.session.apply(Trigger::Join { realm: "somerealm".to_string() }).await;
    let welcome = crate::message::Msg::Welcome {
        session: session_id,
        details: dict(json!({"roles": {"broker": {}}})),
    };
    h.session.apply(Trigger::MessageReceived(welcome)).await;
    assert_eq!(h.session.state(), SessionState::Joined);
}

#[tokio::test]
async fn scenario_a_subscribe_event_unsubscribe() {
    let mut h = harness(vec![713845233, 85346237]);
    join(&mut h, 9129137332).await;

    // Role advertisement order depends on HashSet iteration, so compare
    // parsed JSON values rather than the literal frame text.
    let hello: serde_json::Value = serde_json::from_str(&h.sent.lock().unwrap()[0]).unwrap();
    assert_eq!(
        hello,
        serde_json::from_str::<serde_json::Value>(
            r#"[1,"somerealm",{"roles":{"publisher":{},"subscriber":{},"caller":{},"callee":{}}}]"#
        )
        .unwrap()
    );

    let (sink, mut stream) = mpsc::unbounded_channel();
    h.session
        .apply(Trigger::Subscribe {
            topic: "com.myapp.mytopic1".to_string(),
            sink,
        })
        .await;
    assert_eq!(
        h.sent.lock().unwrap().last().unwrap(),
        r#"[32,713845233,{},"com.myapp.mytopic1"]"#
    );

    let subscribed = crate::message::Msg::Subscribed {
        request: 713845233,
        subscription: 5512315355,
    };
    h.session.apply(Trigger::MessageReceived(subscribed)).await;
    assert!(matches!(
        stream.recv().await.unwrap(),
        SubscriptionEvent::Established(5512315355)
    ));

    let event = crate::message::Msg::Event {
        subscription: 5512315355,
        publication: 4429313566,
        details: WampDict::new(),
        arguments: Some(vec![]),
        arguments_kw: Some(dict(json!({"color": "orange", "sizes": [23, 42, 7]}))),
    };
    h.session.apply(Trigger::MessageReceived(event)).await;
    match stream.recv().await.unwrap() {
        SubscriptionEvent::Payload {
            arguments,
            arguments_kw,
        } => {
            assert_eq!(arguments, Some(vec![]));
            assert_eq!(
                arguments_kw,
                Some(dict(json!({"color": "orange", "sizes": [23, 42, 7]})))
            );
        }
        other => panic!("wrong event: {:?}", other),
    }

    h.session
        .apply(Trigger::Unsubscribe {
            subscription: 5512315355,
        })
        .await;
    assert_eq!(
        h.sent.lock().unwrap().last().unwrap(),
        "[34,85346237,5512315355]"
    );

    let unsubscribed = crate::message::Msg::Unsubscribed { request: 85346237 };
    h.session.apply(Trigger::MessageReceived(unsubscribed)).await;
    assert!(matches!(stream.recv().await.unwrap(), SubscriptionEvent::Closed));
    assert!(stream.recv().await.is_none());
}

#[tokio::test]
async fn scenario_b_acknowledged_publish_error() {
    let mut h = harness(vec![239714735]);
    join(&mut h, 1).await;

    let (sink, mut stream) = mpsc::unbounded_channel();
    h.session
        .apply(Trigger::Publish {
            topic: "com.myapp.mytopic1".to_string(),
            options_acknowledge: true,
            arguments: None,
            arguments_kw: None,
            sink,
        })
        .await;
    assert_eq!(
        h.sent.lock().unwrap().last().unwrap(),
        r#"[16,239714735,{"acknowledge":true},"com.myapp.mytopic1"]"#
    );

    let error = crate::message::Msg::Error {
        orig_type: crate::message::msg_type::PUBLISH,
        request: 239714735,
        details: WampDict::new(),
        error: "wamp.error.not_authorized".to_string(),
        arguments: None,
        arguments_kw: None,
    };
    h.session.apply(Trigger::MessageReceived(error)).await;
    match stream.recv().await.unwrap() {
        PublicationEvent::PublicationFailed(uri) => assert_eq!(uri, "wamp.error.not_authorized"),
        other => panic!("wrong event: {:?}", other),
    }
    assert!(stream.recv().await.is_none());
}

#[tokio::test]
async fn scenario_c_call_result() {
    let mut h = harness(vec![7814135]);
    join(&mut h, 1).await;

    let (sink, mut stream) = mpsc::unbounded_channel();
    h.session
        .apply(Trigger::Call {
            procedure: "com.myapp.echo".to_string(),
            arguments: Some(vec![json!("Hello, world!")]),
            arguments_kw: None,
            sink,
        })
        .await;
    assert_eq!(
        h.sent.lock().unwrap().last().unwrap(),
        r#"[48,7814135,{},"com.myapp.echo",["Hello, world!"]]"#
    );

    let result = crate::message::Msg::Result {
        request: 7814135,
        details: WampDict::new(),
        arguments: Some(vec![json!("Hello, world!")]),
        arguments_kw: None,
    };
    h.session.apply(Trigger::MessageReceived(result)).await;
    match stream.recv().await.unwrap() {
        CallerEvent::CallSucceeded {
            arguments,
            arguments_kw,
        } => {
            assert_eq!(arguments, Some(vec![json!("Hello, world!")]));
            assert_eq!(arguments_kw, None);
        }
        other => panic!("wrong event: {:?}", other),
    }
}

#[tokio::test]
async fn scenario_d_register_invocation_yield() {
    let mut h = harness(vec![25349185]);
    join(&mut h, 1).await;

    let (sink, mut stream) = mpsc::unbounded_channel();
    h.session
        .apply(Trigger::Register {
            procedure: "com.myapp.myprocedure1".to_string(),
            sink,
        })
        .await;
    assert_eq!(
        h.sent.lock().unwrap().last().unwrap(),
        r#"[64,25349185,{},"com.myapp.myprocedure1"]"#
    );

    let registered = crate::message::Msg::Registered {
        request: 25349185,
        registration: 2103333224,
    };
    h.session.apply(Trigger::MessageReceived(registered)).await;
    assert!(matches!(
        stream.recv().await.unwrap(),
        CalleeEvent::Registered(2103333224)
    ));

    let invocation = crate::message::Msg::Invocation {
        request: 6131533,
        registration: 2103333224,
        details: WampDict::new(),
        arguments: Some(vec![json!("johnny")]),
        arguments_kw: Some(dict(json!({"firstname": "John", "surname": "Doe"}))),
    };
    h.session.apply(Trigger::MessageReceived(invocation)).await;
    let responder = match stream.recv().await.unwrap() {
        CalleeEvent::Invocation {
            arguments,
            arguments_kw,
            responder,
        } => {
            assert_eq!(arguments, Some(vec![json!("johnny")]));
            assert_eq!(
                arguments_kw,
                Some(dict(json!({"firstname": "John", "surname": "Doe"})))
            );
            responder
        }
        other => panic!("wrong event: {:?}", other),
    };

    responder.respond(CallOutcome::Yield {
        arguments: Some(vec![]),
        arguments_kw: Some(dict(json!({"userid": 123, "karma": 10}))),
    });
    let trigger = h.ctl_rx.recv().await.expect("responder enqueued a trigger");
    h.session.apply(trigger).await;

    assert_eq!(
        h.sent.lock().unwrap().last().unwrap(),
        r#"[70,6131533,{},[],{"userid":123,"karma":10}]"#
    );
}

#[tokio::test]
async fn scenario_e_protocol_violation_on_unexpected_subscribed() {
    let mut h = harness(vec![]);
    join(&mut h, 1).await;

    let subscribed = crate::message::Msg::Subscribed {
        request: 999,
        subscription: 12345,
    };
    h.session.apply(Trigger::MessageReceived(subscribed)).await;

    assert_eq!(h.session.state(), SessionState::Aborted);
    let sent = h.sent.lock().unwrap();
    let last = sent.last().unwrap();
    let parsed: serde_json::Value = serde_json::from_str(last).unwrap();
    assert_eq!(parsed[0], 3);
    assert_eq!(parsed[2], "wamp.error.protocol_violation");

    let closed = h.closed.lock().unwrap().clone().unwrap();
    assert_eq!(closed.0, crate::common::close_code::PROTOCOL_ERROR);
}

#[tokio::test]
async fn scenario_f_router_goodbye_with_shutdown() {
    let mut h = harness(vec![]);
    join(&mut h, 1).await;

    let goodbye = crate::message::Msg::Goodbye {
        details: WampDict::new(),
        reason: crate::common::close_reason::SYSTEM_SHUTDOWN.to_string(),
    };
    h.session.apply(Trigger::MessageReceived(goodbye)).await;

    assert_eq!(
        h.sent.lock().unwrap().last().unwrap(),
        r#"[6,{},"wamp.close.goodbye_and_out"]"#
    );
    assert_eq!(h.session.state(), SessionState::ShutDown);
    let closed = h.closed.lock().unwrap().clone().unwrap();
    assert_eq!(closed.0, crate::common::close_code::NORMAL_CLOSURE);
}

#[tokio::test]
async fn router_abort_while_joining_is_not_a_protocol_violation() {
    let mut h = harness(vec![]);
    h.session
        .apply(Trigger::Join {
            realm: "somerealm".to_string(),
        })
        .await;
    assert_eq!(h.session.state(), SessionState::Joining);

    let abort = crate::message::Msg::Abort {
        details: WampDict::new(),
        reason: "wamp.error.no_such_realm".to_string(),
    };
    h.session.apply(Trigger::MessageReceived(abort)).await;

    assert_eq!(h.session.state(), SessionState::Aborted);
    // Only HELLO was sent; no ABORT echoed back, and NORMAL_CLOSURE since
    // this is the router's own abort, not a protocol violation of ours.
    assert_eq!(h.sent.lock().unwrap().len(), 1);
    let closed = h.closed.lock().unwrap().clone().unwrap();
    assert_eq!(closed.0, crate::common::close_code::NORMAL_CLOSURE);
}

#[tokio::test]
async fn router_abort_while_joined_is_not_a_protocol_violation() {
    let mut h = harness(vec![]);
    join(&mut h, 1).await;

    let abort = crate::message::Msg::Abort {
        details: WampDict::new(),
        reason: "wamp.error.not_authorized".to_string(),
    };
    h.session.apply(Trigger::MessageReceived(abort)).await;

    assert_eq!(h.session.state(), SessionState::Aborted);
    // A router-initiated ABORT is not a protocol violation: no ABORT is
    // echoed back, and the transport closes with NORMAL_CLOSURE.
    assert!(h.sent.lock().unwrap().is_empty());
    let closed = h.closed.lock().unwrap().clone().unwrap();
    assert_eq!(closed.0, crate::common::close_code::NORMAL_CLOSURE);
}

#[tokio::test]
async fn application_op_outside_joined_aborts_the_session() {
    let mut h = harness(vec![]);
    let (sink, _stream) = mpsc::unbounded_channel();
    h.session
        .apply(Trigger::Subscribe {
            topic: "com.myapp.mytopic1".to_string(),
            sink,
        })
        .await;
    assert_eq!(h.session.state(), SessionState::Aborted);
    // API misuse (§7 item 5), not a wire-level protocol violation: the
    // transport closes with NORMAL_CLOSURE, not PROTOCOL_ERROR.
    let closed = h.closed.lock().unwrap().clone().unwrap();
    assert_eq!(closed.0, crate::common::close_code::NORMAL_CLOSURE);
}

#[tokio::test]
async fn binary_frame_is_a_protocol_violation() {
    let mut h = harness(vec![]);
    join(&mut h, 1).await;
    h.session.apply(Trigger::BinaryMessageReceived).await;
    assert_eq!(h.session.state(), SessionState::Aborted);
    let closed = h.closed.lock().unwrap().clone().unwrap();
    assert_eq!(closed.0, crate::common::close_code::PROTOCOL_ERROR);
}

#[tokio::test]
async fn event_for_a_subscription_we_never_subscribed_to_is_a_protocol_violation() {
    let mut h = harness(vec![]);
    join(&mut h, 1).await;

    let event = crate::message::Msg::Event {
        subscription: 42,
        publication: 1,
        details: WampDict::new(),
        arguments: None,
        arguments_kw: None,
    };
    h.session.apply(Trigger::MessageReceived(event)).await;

    assert_eq!(h.session.state(), SessionState::Aborted);
    let closed = h.closed.lock().unwrap().clone().unwrap();
    assert_eq!(closed.0, crate::common::close_code::PROTOCOL_ERROR);
}

#[tokio::test]
async fn event_racing_an_in_flight_unsubscribe_is_dropped_silently() {
    let mut h = harness(vec![713845233, 85346237]);
    join(&mut h, 1).await;

    let (sink, mut stream) = mpsc::unbounded_channel();
    h.session
        .apply(Trigger::Subscribe {
            topic: "com.myapp.mytopic1".to_string(),
            sink,
        })
        .await;
    let subscribed = crate::message::Msg::Subscribed {
        request: 713845233,
        subscription: 5512315355,
    };
    h.session.apply(Trigger::MessageReceived(subscribed)).await;
    assert!(matches!(
        stream.recv().await.unwrap(),
        SubscriptionEvent::Established(5512315355)
    ));

    h.session
        .apply(Trigger::Unsubscribe {
            subscription: 5512315355,
        })
        .await;

    // An EVENT arrives for the subscription while UNSUBSCRIBE is in flight:
    // the subscription id is no longer in `subscriptions` but is still
    // parked in `pending_unsubscriptions`, so this must be dropped silently
    // rather than aborting the session.
    let event = crate::message::Msg::Event {
        subscription: 5512315355,
        publication: 1,
        details: WampDict::new(),
        arguments: None,
        arguments_kw: None,
    };
    h.session.apply(Trigger::MessageReceived(event)).await;
    assert_eq!(h.session.state(), SessionState::Joined);
}

#[tokio::test]
async fn invocation_for_a_registration_we_never_registered_is_a_protocol_violation() {
    let mut h = harness(vec![]);
    join(&mut h, 1).await;

    let invocation = crate::message::Msg::Invocation {
        request: 1,
        registration: 42,
        details: WampDict::new(),
        arguments: None,
        arguments_kw: None,
    };
    h.session.apply(Trigger::MessageReceived(invocation)).await;

    assert_eq!(h.session.state(), SessionState::Aborted);
    let closed = h.closed.lock().unwrap().clone().unwrap();
    assert_eq!(closed.0, crate::common::close_code::PROTOCOL_ERROR);
}

#[tokio::test]
async fn invocation_racing_an_in_flight_unregister_is_dropped_silently() {
    let mut h = harness(vec![25349185, 11111111]);
    join(&mut h, 1).await;

    let (sink, mut stream) = mpsc::unbounded_channel();
    h.session
        .apply(Trigger::Register {
            procedure: "com.myapp.myprocedure1".to_string(),
            sink,
        })
        .await;
    let registered = crate::message::Msg::Registered {
        request: 25349185,
        registration: 2103333224,
    };
    h.session.apply(Trigger::MessageReceived(registered)).await;
    assert!(matches!(
        stream.recv().await.unwrap(),
        CalleeEvent::Registered(2103333224)
    ));

    h.session
        .apply(Trigger::Unregister {
            registration: 2103333224,
        })
        .await;

    // An INVOCATION arrives while UNREGISTER is in flight: the registration
    // id is no longer in `registrations` but is still parked in
    // `pending_unregistrations`, so this must be dropped silently.
    let invocation = crate::message::Msg::Invocation {
        request: 99,
        registration: 2103333224,
        details: WampDict::new(),
        arguments: None,
        arguments_kw: None,
    };
    h.session.apply(Trigger::MessageReceived(invocation)).await;
    assert_eq!(h.session.state(), SessionState::Joined);
}

#[tokio::test]
async fn any_further_trigger_after_aborted_is_a_no_op() {
    let mut h = harness(vec![]);
    join(&mut h, 1).await;
    h.session.apply(Trigger::BinaryMessageReceived).await;
    assert_eq!(h.session.state(), SessionState::Aborted);
    h.sent.lock().unwrap().clear();
    *h.closed.lock().unwrap() = None;

    // A further application op, a further undecodable frame, and a further
    // transport failure must all be no-ops: no new ABORT sent, no new close,
    // state stays Aborted.
    let (sink, mut stream) = mpsc::unbounded_channel();
    h.session
        .apply(Trigger::Subscribe {
            topic: "com.myapp.mytopic1".to_string(),
            sink,
        })
        .await;
    h.session
        .apply(Trigger::InvalidMessageReceived(crate::message::InvalidMessage::UnknownType {
            text: "[9999]".to_string(),
            code: 9999,
        }))
        .await;
    h.session
        .apply(Trigger::WebSocketFailed("socket reset".to_string()))
        .await;

    assert_eq!(h.session.state(), SessionState::Aborted);
    assert!(h.sent.lock().unwrap().is_empty());
    assert!(h.closed.lock().unwrap().is_none());
    assert!(stream.recv().await.is_none());
}

#[tokio::test]
async fn unacknowledged_publish_closes_its_sink_with_no_events() {
    let mut h = harness(vec![1]);
    join(&mut h, 1).await;

    let (sink, mut stream) = mpsc::unbounded_channel();
    h.session
        .apply(Trigger::Publish {
            topic: "com.myapp.mytopic1".to_string(),
            options_acknowledge: false,
            arguments: None,
            arguments_kw: None,
            sink,
        })
        .await;

    assert!(stream.recv().await.is_none());
}
