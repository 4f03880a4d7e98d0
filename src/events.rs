//! The per-operation event sums delivered on sinks.
//!
//! Each is a tagged variant, not a class hierarchy. Terminal variants are
//! documented as such; once a sink has delivered a terminal variant it is
//! dropped and no further events follow.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc::UnboundedSender;

use crate::message::{WampArgs, WampId, WampKwArgs};
use crate::session::Trigger;

/// Events delivered on a subscription's sink.
#[derive(Debug, Clone)]
pub enum SubscriptionEvent {
    /// Non-terminal: the SUBSCRIBE succeeded.
    Established(WampId),
    /// Non-terminal: an EVENT arrived for this subscription.
    Payload {
        arguments: Option<WampArgs>,
        arguments_kw: Option<WampKwArgs>,
    },
    /// Terminal: the subscription was cleanly unsubscribed.
    Closed,
    /// Terminal: the SUBSCRIBE was rejected.
    SubscriptionFailed(String),
    /// Terminal: the UNSUBSCRIBE was rejected; the subscription is still
    /// considered closed locally per the session's registries.
    UnsubscriptionFailed(String),
}

impl SubscriptionEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SubscriptionEvent::Closed
                | SubscriptionEvent::SubscriptionFailed(_)
                | SubscriptionEvent::UnsubscriptionFailed(_)
        )
    }
}

/// Events delivered on a registration's sink.
#[derive(Debug)]
pub enum CalleeEvent {
    /// Non-terminal: the REGISTER succeeded.
    Registered(WampId),
    /// Non-terminal: an INVOCATION arrived for this registration. The
    /// consumer must call `responder.respond(...)` exactly once.
    Invocation {
        arguments: Option<WampArgs>,
        arguments_kw: Option<WampKwArgs>,
        responder: Responder,
    },
    /// Terminal: the registration was cleanly unregistered.
    Unregistered,
    /// Terminal: the REGISTER was rejected.
    RegistrationFailed(String),
    /// Terminal: the UNREGISTER was rejected.
    UnregistrationFailed(String),
}

impl CalleeEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CalleeEvent::Unregistered
                | CalleeEvent::RegistrationFailed(_)
                | CalleeEvent::UnregistrationFailed(_)
        )
    }
}

/// Events delivered on a call's sink. Exactly one of these is ever sent.
#[derive(Debug, Clone)]
pub enum CallerEvent {
    /// Terminal: the CALL returned a RESULT.
    CallSucceeded {
        arguments: Option<WampArgs>,
        arguments_kw: Option<WampKwArgs>,
    },
    /// Terminal: the CALL returned an ERROR.
    CallFailed {
        error: String,
        arguments: Option<WampArgs>,
        arguments_kw: Option<WampKwArgs>,
    },
}

/// Events delivered on a publication's sink (only created when the caller
/// requested acknowledgement; otherwise the sink closes with no events).
#[derive(Debug, Clone)]
pub enum PublicationEvent {
    /// Terminal: the PUBLISH was acknowledged.
    PublicationSucceeded(WampId),
    /// Terminal: the PUBLISH was rejected.
    PublicationFailed(String),
}

/// What a callee chooses to submit in response to an [`CalleeEvent::Invocation`].
#[derive(Debug, Clone)]
pub enum CallOutcome {
    Yield {
        arguments: Option<WampArgs>,
        arguments_kw: Option<WampKwArgs>,
    },
    Error {
        error: String,
        arguments: Option<WampArgs>,
        arguments_kw: Option<WampKwArgs>,
    },
}

/// A bound capability carrying the session's control channel and the
/// INVOCATION's request id. Calling `respond` enqueues a Yield/Error trigger
/// on the session's event loop.
///
/// Single-call is enforced: a second `respond` call is a logged no-op. If
/// the session has already left JOINED (or the event loop has shut down),
/// `respond` is also a silent no-op.
#[derive(Debug)]
pub struct Responder {
    request: WampId,
    ctl: UnboundedSender<Trigger>,
    used: AtomicBool,
}

impl Responder {
    pub(crate) fn new(request: WampId, ctl: UnboundedSender<Trigger>) -> Self {
        Self {
            request,
            ctl,
            used: AtomicBool::new(false),
        }
    }

    pub fn request_id(&self) -> WampId {
        self.request
    }

    pub fn respond(&self, outcome: CallOutcome) {
        if self.used.swap(true, Ordering::SeqCst) {
            log::warn!(
                "Responder for request {} was invoked more than once; ignoring",
                self.request
            );
            return;
        }
        let _ = self.ctl.send(Trigger::Yield {
            request: self.request,
            outcome,
        });
    }
}
