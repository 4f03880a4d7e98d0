//! The session state machine — the heart of this crate.
//!
//! A [`Session`] is driven by a single task that owns it exclusively and
//! processes one [`Trigger`] at a time via [`Session::apply`]: a
//! single-consumer serialized event evaluator. Because `apply` takes
//! `&mut self` and is only ever called from one place, the registries,
//! allocator and state are linearized for free — no mutex required.

mod ops;
mod recv;
#[cfg(test)]
mod tests;

use std::collections::HashSet;

use log::*;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use crate::codec::MessageCodec;
use crate::common::{close_code, close_reason, ClientRole};
use crate::error::WampError;
use crate::events::CallOutcome;
use crate::id::IdAllocator;
use crate::message::{InvalidMessage, Msg, WampArgs, WampId, WampKwArgs};
use crate::registry::{CalleeSink, CallerSink, PubSink, Registries, SubSink};
use crate::transport::{Transport, TransportEvent};

/// The seven states a session moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Initial,
    Joining,
    Joined,
    Leaving,
    ShuttingDown,
    ShutDown,
    Aborted,
}

/// All inputs the evaluator reacts to: application intents and
/// transport-origin occurrences, unified into one tagged stream.
pub enum Trigger {
    // -- application intents --
    Join { realm: String },
    Leave,
    Shutdown,
    Subscribe { topic: String, sink: SubSink },
    Unsubscribe { subscription: WampId },
    Publish {
        topic: String,
        options_acknowledge: bool,
        arguments: Option<WampArgs>,
        arguments_kw: Option<WampKwArgs>,
        sink: PubSink,
    },
    Register { procedure: String, sink: CalleeSink },
    Unregister { registration: WampId },
    Call {
        procedure: String,
        arguments: Option<WampArgs>,
        arguments_kw: Option<WampKwArgs>,
        sink: CallerSink,
    },
    /// Submitted by a [`crate::events::Responder`] in answer to an
    /// `Invocation` event.
    Yield { request: WampId, outcome: CallOutcome },

    // -- transport-origin events --
    MessageReceived(Msg),
    /// A frame arrived that could not be decoded at all — always a
    /// protocol violation, regardless of state.
    InvalidMessageReceived(InvalidMessage),
    BinaryMessageReceived,
    WebSocketClosed(u16, String),
    WebSocketFailed(String),
}

/// Lifecycle notifications exposed to the application. All methods
/// default to no-ops so a consumer only overrides what it cares about.
pub trait SessionListener: Send {
    fn on_realm_joined(&mut self, _realm: &str) {}
    fn on_realm_left(&mut self, _realm: &str, _from_router: bool) {}
    fn on_session_shutdown(&mut self) {}
    fn on_session_aborted(&mut self, _reason: &str, _error: Option<&WampError>) {}
}

/// A listener that does nothing; the default when the application does not
/// care to observe lifecycle events.
pub struct NullListener;
impl SessionListener for NullListener {}

pub struct Session {
    state: SessionState,
    realm: Option<String>,
    roles: HashSet<ClientRole>,
    agent: Option<String>,
    session_id: Option<WampId>,

    transport: Box<dyn Transport + Send>,
    codec: Box<dyn MessageCodec + Send>,
    allocator: Box<dyn IdAllocator + Send>,
    registries: Registries,
    listener: Box<dyn SessionListener>,
    /// A clone of the control channel's sender, handed to every
    /// [`crate::events::Responder`] so an `Invocation` reply can be enqueued
    /// back onto this same session's evaluator.
    ctl_tx: UnboundedSender<Trigger>,
}

impl Session {
    pub fn new(
        transport: Box<dyn Transport + Send>,
        codec: Box<dyn MessageCodec + Send>,
        allocator: Box<dyn IdAllocator + Send>,
        roles: HashSet<ClientRole>,
        agent: Option<String>,
        listener: Box<dyn SessionListener>,
        ctl_tx: UnboundedSender<Trigger>,
    ) -> Self {
        Self {
            state: SessionState::Initial,
            realm: None,
            roles,
            agent,
            session_id: None,
            transport,
            codec,
            allocator,
            registries: Registries::new(),
            listener,
            ctl_tx,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn session_id(&self) -> Option<WampId> {
        self.session_id
    }

    /// Runs the event loop until the session reaches `ShutDown` or
    /// `Aborted`. Consumes `self`, matching the single-owner evaluator
    /// design: once this future ends, the session is unusable.
    pub async fn run(mut self, mut ctl: UnboundedReceiver<Trigger>) {
        loop {
            if matches!(self.state, SessionState::ShutDown | SessionState::Aborted) {
                break;
            }

            tokio::select! {
                event = self.transport.recv() => {
                    let trigger = self.transport_event_to_trigger(event);
                    self.apply(trigger).await;
                }
                req = ctl.recv() => {
                    match req {
                        Some(t) => self.apply(t).await,
                        None => {
                            // The client handle was dropped without an explicit Shutdown.
                            self.abort(WampError::ClientDied, "client dropped").await;
                        }
                    }
                }
            }
        }
        debug!("Session event loop exiting in state {:?}", self.state);
    }

    fn transport_event_to_trigger(&self, event: TransportEvent) -> Trigger {
        match event {
            TransportEvent::Text(text) => match self.codec.decode(&text) {
                Ok(msg) => Trigger::MessageReceived(msg),
                Err(e) => Trigger::InvalidMessageReceived(e),
            },
            TransportEvent::Binary(_) => Trigger::BinaryMessageReceived,
            TransportEvent::Closing(code, reason) | TransportEvent::Closed(code, reason) => {
                Trigger::WebSocketClosed(code, reason)
            }
            TransportEvent::Failed(e) => Trigger::WebSocketFailed(e),
        }
    }

    /// Processes exactly one trigger to completion. This is the serialized
    /// evaluator's single entry point.
    pub async fn apply(&mut self, trigger: Trigger) {
        // "ABORTED | Any event | No-op" — once aborted nothing further is
        // observable: no further ABORT frames, no re-draining of (already
        // empty) registries, no re-notifying the listener.
        if self.state == SessionState::Aborted {
            return;
        }
        match trigger {
            Trigger::InvalidMessageReceived(e) => {
                self.abort_protocol_violation(format!("received an undecodable frame: {}", e))
                    .await;
            }
            Trigger::BinaryMessageReceived => {
                self.abort_protocol_violation(
                    "received a binary frame on a text-only (wamp.2.json) transport".to_string(),
                )
                .await;
            }
            Trigger::WebSocketClosed(code, reason) => match self.state {
                SessionState::Aborted | SessionState::ShutDown => {}
                _ => {
                    self.abort(
                        WampError::ConnectionError(crate::transport::TransportError::ReceiveFailed),
                        &format!("transport closed (code={}, reason={})", code, reason),
                    )
                    .await;
                }
            },
            Trigger::WebSocketFailed(e) => match self.state {
                SessionState::Aborted | SessionState::ShutDown => {}
                _ => {
                    self.abort(
                        WampError::ConnectionError(crate::transport::TransportError::ReceiveFailed),
                        &format!("transport failed: {}", e),
                    )
                    .await;
                }
            },
            Trigger::MessageReceived(msg) => self.apply_message(msg).await,

            Trigger::Join { realm } => ops::join(self, realm).await,
            Trigger::Leave => ops::leave(self).await,
            Trigger::Shutdown => ops::shutdown(self).await,
            Trigger::Subscribe { topic, sink } => ops::subscribe(self, topic, sink).await,
            Trigger::Unsubscribe { subscription } => ops::unsubscribe(self, subscription).await,
            Trigger::Publish {
                topic,
                options_acknowledge,
                arguments,
                arguments_kw,
                sink,
            } => {
                ops::publish(
                    self,
                    topic,
                    options_acknowledge,
                    arguments,
                    arguments_kw,
                    sink,
                )
                .await
            }
            Trigger::Register { procedure, sink } => ops::register(self, procedure, sink).await,
            Trigger::Unregister { registration } => ops::unregister(self, registration).await,
            Trigger::Call {
                procedure,
                arguments,
                arguments_kw,
                sink,
            } => ops::call(self, procedure, arguments, arguments_kw, sink).await,
            Trigger::Yield { request, outcome } => ops::yield_response(self, request, outcome).await,
        }
    }

    async fn apply_message(&mut self, msg: Msg) {
        match self.state {
            SessionState::Initial => match msg {
                Msg::Error { .. } => { /* ignored before the session is ready */ }
                _ => {
                    self.abort_protocol_violation(format!(
                        "received {} before the session was ready",
                        msg.name()
                    ))
                    .await;
                }
            },
            SessionState::Joining => match msg {
                Msg::Welcome { session, details: _ } => {
                    self.session_id = Some(session);
                    self.state = SessionState::Joined;
                    let realm = self.realm.clone().unwrap_or_default();
                    self.listener.on_realm_joined(&realm);
                }
                Msg::Abort { details, reason } => {
                    self.abort_router(reason, details).await;
                }
                other => {
                    self.abort_protocol_violation(format!(
                        "expected WELCOME or ABORT while joining, got {}",
                        other.name()
                    ))
                    .await;
                }
            },
            SessionState::Joined => recv::handle(self, msg).await,
            SessionState::Leaving | SessionState::ShuttingDown => match msg {
                Msg::Goodbye { .. } => recv::goodbye_ack(self).await,
                _ => { /* any other message is ignored while leaving */ }
            },
            SessionState::ShutDown => match msg {
                Msg::Error { .. } => {}
                _ => {
                    warn!("Received {} after shutdown; ignoring", msg.name());
                }
            },
            SessionState::Aborted => {}
        }
    }

    /// Drains every sink, notifies the listener,
    /// sends ABORT to the router if still writable, and closes the
    /// transport with the appropriate close code.
    pub(crate) async fn abort(&mut self, error: WampError, reason: &str) {
        if self.state == SessionState::Aborted {
            return;
        }
        self.send_local_abort(reason).await;
        self.finish_abort(reason, Some(error)).await;
    }

    pub(crate) async fn abort_protocol_violation(&mut self, reason: String) {
        self.send_local_abort(&reason).await;
        self.finish_abort(&reason, Some(WampError::ProtocolViolation(reason.clone())))
            .await;
    }

    /// Same local-ABORT-and-teardown shape as [`Self::abort_protocol_violation`],
    /// for the "API misuse" error category (§7 item 5: e.g. Subscribe before
    /// joining, Join while already joined) rather than a wire-level protocol
    /// violation. The only observable difference is the close code: this path
    /// never carries a `WampError::ProtocolViolation`, so `finish_abort` picks
    /// `NORMAL_CLOSURE` per §6's "abort by local API misuse" classification.
    pub(crate) async fn abort_api_misuse(&mut self, reason: String) {
        self.send_local_abort(&reason).await;
        self.finish_abort(&reason, Some(WampError::SessionAborted(reason.clone())))
            .await;
    }

    async fn send_local_abort(&mut self, reason: &str) {
        if matches!(
            self.state,
            SessionState::Initial | SessionState::Aborted | SessionState::ShutDown
        ) {
            return;
        }
        let mut details = crate::message::WampDict::new();
        details.insert(
            "message".to_string(),
            serde_json::Value::String(reason.to_string()),
        );
        let msg = Msg::Abort {
            details,
            reason: close_reason::PROTOCOL_VIOLATION.to_string(),
        };
        let text = self.codec.encode(&msg);
        let _ = self.transport.send(&text).await;
    }

    async fn abort_router(&mut self, reason: String, details: crate::message::WampDict) {
        self.finish_abort(&reason, None).await;
        let _ = details;
    }

    async fn finish_abort(&mut self, reason: &str, error: Option<WampError>) {
        self.state = SessionState::Aborted;
        self.registries.drain_all(reason);
        self.listener.on_session_aborted(reason, error.as_ref());
        let code = if matches!(error, Some(WampError::ProtocolViolation(_))) {
            close_code::PROTOCOL_ERROR
        } else {
            close_code::NORMAL_CLOSURE
        };
        let _ = self
            .transport
            .close(code, Some(reason.to_string()))
            .await;
    }
}
