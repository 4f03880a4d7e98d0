//! Handlers for application-originated triggers: one function per
//! application intent (join, leave, shutdown, subscribe, publish, ...).

use log::*;
use serde_json::Value;

use crate::common::close_reason;
use crate::events::{CallOutcome, CallerEvent, PublicationEvent};
use crate::message::{Msg, WampArgs, WampDict, WampId, WampKwArgs};
use crate::registry::{CalleeSink, CallerSink, PubSink, SubSink};

use super::{Session, SessionState};

/// True while in JOINED; any application op outside JOINED is API misuse
/// per the transition table ("unspecified events on a state are protocol
/// violations") and §7 item 5 ("API misuse ... Subscribe before joining").
fn require_joined(session: &mut Session) -> bool {
    session.state == SessionState::Joined
}

pub async fn join(session: &mut Session, realm: String) {
    match session.state {
        SessionState::Initial => {
            let mut details = WampDict::new();
            let mut client_roles = WampDict::new();
            for role in &session.roles {
                client_roles.insert(role.to_str().to_string(), Value::Object(WampDict::new()));
            }
            details.insert("roles".to_string(), Value::Object(client_roles));
            if let Some(agent) = &session.agent {
                if !agent.is_empty() {
                    details.insert("agent".to_string(), Value::String(agent.clone()));
                }
            }

            let msg = Msg::Hello {
                realm: realm.clone(),
                details,
            };
            let text = session.codec.encode(&msg);
            if session.transport.send(&text).await.is_err() {
                session
                    .abort(
                        crate::error::WampError::ConnectionError(
                            crate::transport::TransportError::SendFailed,
                        ),
                        "failed to send HELLO",
                    )
                    .await;
                return;
            }
            session.realm = Some(realm);
            session.state = SessionState::Joining;
        }
        SessionState::Joined | SessionState::Joining => {
            session
                .abort_api_misuse("Join called while already joining/joined".to_string())
                .await;
        }
        _ => {
            session
                .abort_api_misuse(format!("Join called in state {:?}", session.state))
                .await;
        }
    }
}

pub async fn leave(session: &mut Session) {
    match session.state {
        SessionState::Joined => {
            let msg = Msg::Goodbye {
                details: WampDict::new(),
                reason: close_reason::CLOSE_REALM.to_string(),
            };
            let text = session.codec.encode(&msg);
            let _ = session.transport.send(&text).await;
            session.state = SessionState::Leaving;
        }
        SessionState::Joining => {
            session
                .abort(
                    crate::error::WampError::SessionAborted(
                        "Leave requested before WELCOME".to_string(),
                    ),
                    "left before the session was established",
                )
                .await;
        }
        SessionState::ShutDown | SessionState::Aborted => {}
        _ => {
            session
                .abort_api_misuse(format!("Leave called in state {:?}", session.state))
                .await;
        }
    }
}

pub async fn shutdown(session: &mut Session) {
    match session.state {
        SessionState::Initial => {
            session.registries.drain_all("session shutdown");
            let _ = session
                .transport
                .close(crate::common::close_code::NORMAL_CLOSURE, None)
                .await;
            session.state = SessionState::ShutDown;
            session.listener.on_session_shutdown();
        }
        SessionState::Joined => {
            let msg = Msg::Goodbye {
                details: WampDict::new(),
                reason: close_reason::SYSTEM_SHUTDOWN.to_string(),
            };
            let text = session.codec.encode(&msg);
            let _ = session.transport.send(&text).await;
            session.state = SessionState::ShuttingDown;
        }
        SessionState::Joining => {
            session
                .abort(
                    crate::error::WampError::SessionAborted(
                        "Shutdown requested before WELCOME".to_string(),
                    ),
                    "shut down before the session was established",
                )
                .await;
        }
        SessionState::ShutDown | SessionState::Aborted => { /* no-op */ }
        _ => {
            session
                .abort_api_misuse(format!("Shutdown called in state {:?}", session.state))
                .await;
        }
    }
}

pub async fn subscribe(session: &mut Session, topic: String, sink: SubSink) {
    if !require_joined(session) {
        let _ = sink.send(crate::events::SubscriptionEvent::SubscriptionFailed(
            "session is not joined to a realm".to_string(),
        ));
        session
            .abort_api_misuse("Subscribe called outside JOINED".to_string())
            .await;
        return;
    }

    let request = session.allocator.new_id();
    let msg = Msg::Subscribe {
        request,
        options: WampDict::new(),
        topic,
    };
    let text = session.codec.encode(&msg);
    if session.transport.send(&text).await.is_err() {
        session.allocator.release_id(request);
        let _ = sink.send(crate::events::SubscriptionEvent::SubscriptionFailed(
            "failed to send SUBSCRIBE".to_string(),
        ));
        return;
    }
    session.registries.pending_subscriptions.insert(request, sink);
}

pub async fn unsubscribe(session: &mut Session, subscription: WampId) {
    if !require_joined(session) {
        session
            .abort_api_misuse("Unsubscribe called outside JOINED".to_string())
            .await;
        return;
    }

    let sink = match session.registries.subscriptions.remove(&subscription) {
        Some(s) => s,
        None => {
            trace!(
                "Unsubscribe for unknown subscription {} ignored",
                subscription
            );
            return;
        }
    };

    let request = session.allocator.new_id();
    let msg = Msg::Unsubscribe {
        request,
        subscription,
    };
    let text = session.codec.encode(&msg);
    if session.transport.send(&text).await.is_err() {
        session.allocator.release_id(request);
        let _ = sink.send(crate::events::SubscriptionEvent::UnsubscriptionFailed(
            "failed to send UNSUBSCRIBE".to_string(),
        ));
        return;
    }
    session
        .registries
        .pending_unsubscriptions
        .insert(request, (subscription, sink));
}

pub async fn publish(
    session: &mut Session,
    topic: String,
    acknowledge: bool,
    arguments: Option<WampArgs>,
    arguments_kw: Option<WampKwArgs>,
    sink: PubSink,
) {
    if !require_joined(session) {
        session
            .abort_api_misuse("Publish called outside JOINED".to_string())
            .await;
        return;
    }

    let request = session.allocator.new_id();
    let mut options = WampDict::new();
    if acknowledge {
        options.insert("acknowledge".to_string(), Value::Bool(true));
    }

    let msg = Msg::Publish {
        request,
        options,
        topic,
        arguments,
        arguments_kw,
    };
    let text = session.codec.encode(&msg);
    if session.transport.send(&text).await.is_err() {
        session.allocator.release_id(request);
        if acknowledge {
            let _ = sink.send(PublicationEvent::PublicationFailed(
                "failed to send PUBLISH".to_string(),
            ));
        }
        return;
    }

    if acknowledge {
        session.registries.pending_publications.insert(request, sink);
    } else {
        // Fire-and-forget: release the id immediately (no response is
        // expected) and close the sink with no events.
        session.allocator.release_id(request);
        drop(sink);
    }
}

pub async fn register(session: &mut Session, procedure: String, sink: CalleeSink) {
    if !require_joined(session) {
        let _ = sink.send(crate::events::CalleeEvent::RegistrationFailed(
            "session is not joined to a realm".to_string(),
        ));
        session
            .abort_api_misuse("Register called outside JOINED".to_string())
            .await;
        return;
    }

    let request = session.allocator.new_id();
    let msg = Msg::Register {
        request,
        options: WampDict::new(),
        procedure,
    };
    let text = session.codec.encode(&msg);
    if session.transport.send(&text).await.is_err() {
        session.allocator.release_id(request);
        let _ = sink.send(crate::events::CalleeEvent::RegistrationFailed(
            "failed to send REGISTER".to_string(),
        ));
        return;
    }
    session.registries.pending_registrations.insert(request, sink);
}

pub async fn unregister(session: &mut Session, registration: WampId) {
    if !require_joined(session) {
        session
            .abort_api_misuse("Unregister called outside JOINED".to_string())
            .await;
        return;
    }

    let sink = match session.registries.registrations.remove(&registration) {
        Some(s) => s,
        None => {
            trace!(
                "Unregister for unknown registration {} ignored",
                registration
            );
            return;
        }
    };

    let request = session.allocator.new_id();
    let msg = Msg::Unregister {
        request,
        registration,
    };
    let text = session.codec.encode(&msg);
    if session.transport.send(&text).await.is_err() {
        session.allocator.release_id(request);
        let _ = sink.send(crate::events::CalleeEvent::UnregistrationFailed(
            "failed to send UNREGISTER".to_string(),
        ));
        return;
    }
    session
        .registries
        .pending_unregistrations
        .insert(request, (registration, sink));
}

pub async fn call(
    session: &mut Session,
    procedure: String,
    arguments: Option<WampArgs>,
    arguments_kw: Option<WampKwArgs>,
    sink: CallerSink,
) {
    if !require_joined(session) {
        let _ = sink.send(CallerEvent::CallFailed {
            error: "session is not joined to a realm".to_string(),
            arguments: None,
            arguments_kw: None,
        });
        session
            .abort_api_misuse("Call called outside JOINED".to_string())
            .await;
        return;
    }

    let request = session.allocator.new_id();
    let msg = Msg::Call {
        request,
        options: WampDict::new(),
        procedure,
        arguments,
        arguments_kw,
    };
    let text = session.codec.encode(&msg);
    if session.transport.send(&text).await.is_err() {
        session.allocator.release_id(request);
        let _ = sink.send(CallerEvent::CallFailed {
            error: "failed to send CALL".to_string(),
            arguments: None,
            arguments_kw: None,
        });
        return;
    }
    session.registries.pending_calls.insert(request, sink);
}

/// A callee's response to a previously-delivered `Invocation` event,
/// submitted through its [`crate::events::Responder`].
pub async fn yield_response(session: &mut Session, request: WampId, outcome: CallOutcome) {
    if session.state != SessionState::Joined {
        // The session left JOINED before the responder fired; this is a
        // silent no-op.
        return;
    }

    let msg = match outcome {
        CallOutcome::Yield {
            arguments,
            arguments_kw,
        } => Msg::Yield {
            request,
            options: WampDict::new(),
            arguments,
            arguments_kw,
        },
        CallOutcome::Error {
            error,
            arguments,
            arguments_kw,
        } => Msg::Error {
            orig_type: crate::message::msg_type::INVOCATION,
            request,
            details: WampDict::new(),
            error,
            arguments,
            arguments_kw,
        },
    };
    let text = session.codec.encode(&msg);
    let _ = session.transport.send(&text).await;
}
