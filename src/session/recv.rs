//! Inbound message handling while JOINED, and the GOODBYE acknowledgment
//! path shared by LEAVING/SHUTTING_DOWN.

use log::*;

use crate::common::close_code;
use crate::events::{CalleeEvent, CallerEvent, PublicationEvent, Responder, SubscriptionEvent};
use crate::message::{msg_type, Msg, WampArgs, WampDict, WampKwArgs};

use super::{Session, SessionState};

/// Dispatches a message received while JOINED.
pub async fn handle(session: &mut Session, msg: Msg) {
    match msg {
        Msg::Subscribed { request, subscription } => on_subscribed(session, request, subscription).await,
        Msg::Unsubscribed { request } => on_unsubscribed(session, request).await,
        Msg::Event {
            subscription,
            arguments,
            arguments_kw,
            ..
        } => on_event(session, subscription, arguments, arguments_kw).await,
        Msg::Published { request, publication } => on_published(session, request, publication).await,
        Msg::Registered { request, registration } => on_registered(session, request, registration).await,
        Msg::Unregistered { request } => on_unregistered(session, request).await,
        Msg::Invocation {
            request,
            registration,
            arguments,
            arguments_kw,
            ..
        } => on_invocation(session, request, registration, arguments, arguments_kw).await,
        Msg::Result {
            request,
            arguments,
            arguments_kw,
            ..
        } => on_result(session, request, arguments, arguments_kw).await,
        Msg::Error {
            orig_type,
            request,
            error,
            arguments,
            arguments_kw,
            ..
        } => on_error(session, orig_type, request, error, arguments, arguments_kw).await,
        Msg::Goodbye { reason, .. } => {
            if reason == crate::common::close_reason::GOODBYE_AND_OUT {
                session
                    .abort_protocol_violation(
                        "received GOODBYE(goodbye_and_out) as a router-initiated close".to_string(),
                    )
                    .await;
            } else {
                on_router_goodbye(session, reason).await;
            }
        }
        Msg::Abort { details, reason } => {
            session.abort_router(reason, details).await;
        }
        other => {
            session
                .abort_protocol_violation(format!(
                    "received {} while JOINED, which is not a valid message in this state",
                    other.name()
                ))
                .await;
        }
    }
}

async fn on_subscribed(session: &mut Session, request: u64, subscription: u64) {
    match session.registries.pending_subscriptions.remove(&request) {
        Some(sink) => {
            session.allocator.release_id(request);
            let established = sink.send(SubscriptionEvent::Established(subscription)).is_ok();
            if established {
                session.registries.subscriptions.insert(subscription, sink);
            }
        }
        None => {
            session
                .abort_protocol_violation(format!("SUBSCRIBED for unknown request {}", request))
                .await;
        }
    }
}

async fn on_unsubscribed(session: &mut Session, request: u64) {
    match session.registries.pending_unsubscriptions.remove(&request) {
        Some((_, sink)) => {
            session.allocator.release_id(request);
            let _ = sink.send(SubscriptionEvent::Closed);
        }
        None => {
            session
                .abort_protocol_violation(format!("UNSUBSCRIBED for unknown request {}", request))
                .await;
        }
    }
}

/// EVENT's missing correlation is a silent drop only when it races an
/// in-flight UNSUBSCRIBE (the subscription id is still parked in
/// `pending_unsubscriptions`, keyed by request id). A subscription id in
/// neither table is a genuine protocol violation: the router sent an EVENT
/// for something we never subscribed to.
async fn on_event(
    session: &mut Session,
    subscription: u64,
    arguments: Option<WampArgs>,
    arguments_kw: Option<WampKwArgs>,
) {
    if let Some(sink) = session.registries.subscriptions.get(&subscription) {
        let _ = sink.send(SubscriptionEvent::Payload {
            arguments,
            arguments_kw,
        });
        return;
    }

    let unsubscribing = session
        .registries
        .pending_unsubscriptions
        .values()
        .any(|(sub_id, _)| *sub_id == subscription);
    if unsubscribing {
        trace!(
            "EVENT for subscription {} racing an in-flight UNSUBSCRIBE dropped silently",
            subscription
        );
        return;
    }

    session
        .abort_protocol_violation(format!(
            "EVENT for subscription {} that we have no subscription for",
            subscription
        ))
        .await;
}

async fn on_published(session: &mut Session, request: u64, publication: u64) {
    match session.registries.pending_publications.remove(&request) {
        Some(sink) => {
            session.allocator.release_id(request);
            let _ = sink.send(PublicationEvent::PublicationSucceeded(publication));
        }
        None => {
            session
                .abort_protocol_violation(format!("PUBLISHED for unknown request {}", request))
                .await;
        }
    }
}

async fn on_registered(session: &mut Session, request: u64, registration: u64) {
    match session.registries.pending_registrations.remove(&request) {
        Some(sink) => {
            session.allocator.release_id(request);
            let registered = sink.send(CalleeEvent::Registered(registration)).is_ok();
            if registered {
                session.registries.registrations.insert(registration, sink);
            }
        }
        None => {
            session
                .abort_protocol_violation(format!("REGISTERED for unknown request {}", request))
                .await;
        }
    }
}

async fn on_unregistered(session: &mut Session, request: u64) {
    match session.registries.pending_unregistrations.remove(&request) {
        Some((_, sink)) => {
            session.allocator.release_id(request);
            let _ = sink.send(CalleeEvent::Unregistered);
        }
        None => {
            session
                .abort_protocol_violation(format!("UNREGISTERED for unknown request {}", request))
                .await;
        }
    }
}

/// INVOCATION's missing correlation is a silent drop only when it races an
/// in-flight UNREGISTER (the registration id is still parked in
/// `pending_unregistrations`, keyed by request id). A registration id in
/// neither table is a genuine protocol violation: the router sent an
/// INVOCATION for something we never registered.
async fn on_invocation(
    session: &mut Session,
    request: u64,
    registration: u64,
    arguments: Option<WampArgs>,
    arguments_kw: Option<WampKwArgs>,
) {
    if let Some(sink) = session.registries.registrations.get(&registration) {
        let responder = Responder::new(request, session.ctl_tx.clone());
        let _ = sink.send(CalleeEvent::Invocation {
            arguments,
            arguments_kw,
            responder,
        });
        return;
    }

    let unregistering = session
        .registries
        .pending_unregistrations
        .values()
        .any(|(reg_id, _)| *reg_id == registration);
    if unregistering {
        trace!(
            "INVOCATION for registration {} racing an in-flight UNREGISTER dropped silently",
            registration
        );
        return;
    }

    session
        .abort_protocol_violation(format!(
            "INVOCATION for registration {} that we have no registration for",
            registration
        ))
        .await;
}

async fn on_result(
    session: &mut Session,
    request: u64,
    arguments: Option<WampArgs>,
    arguments_kw: Option<WampKwArgs>,
) {
    match session.registries.pending_calls.remove(&request) {
        Some(sink) => {
            session.allocator.release_id(request);
            let _ = sink.send(CallerEvent::CallSucceeded {
                arguments,
                arguments_kw,
            });
        }
        None => {
            session
                .abort_protocol_violation(format!("RESULT for unknown request {}", request))
                .await;
        }
    }
}

/// ERROR replies are correlated by `(origType, request)`. An `origType` this
/// client never sends, or a `request` absent from the matching table, are
/// both protocol violations.
async fn on_error(
    session: &mut Session,
    orig_type: u64,
    request: u64,
    error: String,
    arguments: Option<WampArgs>,
    arguments_kw: Option<WampKwArgs>,
) {
    let found = match orig_type {
        msg_type::SUBSCRIBE => session
            .registries
            .pending_subscriptions
            .remove(&request)
            .map(|sink| {
                let _ = sink.send(SubscriptionEvent::SubscriptionFailed(error.clone()));
            })
            .is_some(),
        msg_type::UNSUBSCRIBE => session
            .registries
            .pending_unsubscriptions
            .remove(&request)
            .map(|(_, sink)| {
                let _ = sink.send(SubscriptionEvent::UnsubscriptionFailed(error.clone()));
            })
            .is_some(),
        msg_type::REGISTER => session
            .registries
            .pending_registrations
            .remove(&request)
            .map(|sink| {
                let _ = sink.send(CalleeEvent::RegistrationFailed(error.clone()));
            })
            .is_some(),
        msg_type::UNREGISTER => session
            .registries
            .pending_unregistrations
            .remove(&request)
            .map(|(_, sink)| {
                let _ = sink.send(CalleeEvent::UnregistrationFailed(error.clone()));
            })
            .is_some(),
        msg_type::CALL => session
            .registries
            .pending_calls
            .remove(&request)
            .map(|sink| {
                let _ = sink.send(CallerEvent::CallFailed {
                    error: error.clone(),
                    arguments,
                    arguments_kw,
                });
            })
            .is_some(),
        msg_type::PUBLISH => session
            .registries
            .pending_publications
            .remove(&request)
            .map(|sink| {
                let _ = sink.send(PublicationEvent::PublicationFailed(error.clone()));
            })
            .is_some(),
        _ => {
            session
                .abort_protocol_violation(format!(
                    "received ERROR for an originalType ({}) this client never sends",
                    orig_type
                ))
                .await;
            return;
        }
    };

    if found {
        session.allocator.release_id(request);
    } else {
        session
            .abort_protocol_violation(format!(
                "ERROR for originalType {} references unknown request {}",
                orig_type, request
            ))
            .await;
    }
}

/// A GOODBYE arriving while JOINED is router-initiated: we never sent our
/// own GOODBYE first. Acknowledge it, drain the registries, and notify the
/// listener the realm was left by the router, then decide the resulting
/// state from the reason URI.
async fn on_router_goodbye(session: &mut Session, reason: String) {
    let realm = session.realm.clone().unwrap_or_default();
    session.registries.drain_all("the router said GOODBYE");
    session.listener.on_realm_left(&realm, true);

    let ack = Msg::Goodbye {
        details: WampDict::new(),
        reason: crate::common::close_reason::GOODBYE_AND_OUT.to_string(),
    };
    let text = session.codec.encode(&ack);
    let _ = session.transport.send(&text).await;

    if reason == crate::common::close_reason::SYSTEM_SHUTDOWN {
        session.state = SessionState::ShutDown;
        session.session_id = None;
        session.realm = None;
        let _ = session.transport.close(close_code::NORMAL_CLOSURE, None).await;
        session.listener.on_session_shutdown();
    } else {
        session.state = SessionState::Initial;
        session.session_id = None;
        session.realm = None;
    }
}

/// The router's acknowledgment of a GOODBYE we sent ourselves, received
/// while LEAVING or SHUTTING_DOWN.
pub async fn goodbye_ack(session: &mut Session) {
    let realm = session.realm.clone().unwrap_or_default();
    session.registries.drain_all("left the realm");
    session.listener.on_realm_left(&realm, false);

    match session.state {
        SessionState::Leaving => {
            session.state = SessionState::Initial;
            session.session_id = None;
            session.realm = None;
        }
        SessionState::ShuttingDown => {
            session.state = SessionState::ShutDown;
            session.session_id = None;
            session.realm = None;
            let _ = session.transport.close(close_code::NORMAL_CLOSURE, None).await;
            session.listener.on_session_shutdown();
        }
        other => {
            warn!("goodbye_ack called in unexpected state {:?}", other);
        }
    }
}
