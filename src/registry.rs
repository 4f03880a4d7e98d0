//! The in-memory tables correlating pending requests with the sinks that
//! must be notified on response.

use std::collections::HashMap;

use tokio::sync::mpsc::UnboundedSender;

use crate::events::{CallerEvent, CalleeEvent, PublicationEvent, SubscriptionEvent};
use crate::message::WampId;

pub type SubSink = UnboundedSender<SubscriptionEvent>;
pub type CalleeSink = UnboundedSender<CalleeEvent>;
pub type CallerSink = UnboundedSender<CallerEvent>;
pub type PubSink = UnboundedSender<PublicationEvent>;

/// Every live sink belongs to exactly one of these tables. Mutated only
/// from inside the serialized session evaluator.
#[derive(Default)]
pub struct Registries {
    pub pending_subscriptions: HashMap<WampId, SubSink>,
    pub pending_unsubscriptions: HashMap<WampId, (WampId, SubSink)>,
    pub subscriptions: HashMap<WampId, SubSink>,

    pub pending_registrations: HashMap<WampId, CalleeSink>,
    pub pending_unregistrations: HashMap<WampId, (WampId, CalleeSink)>,
    pub registrations: HashMap<WampId, CalleeSink>,

    pub pending_calls: HashMap<WampId, CallerSink>,
    pub pending_publications: HashMap<WampId, PubSink>,
}

impl Registries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.pending_subscriptions.is_empty()
            && self.pending_unsubscriptions.is_empty()
            && self.subscriptions.is_empty()
            && self.pending_registrations.is_empty()
            && self.pending_unregistrations.is_empty()
            && self.registrations.is_empty()
            && self.pending_calls.is_empty()
            && self.pending_publications.is_empty()
    }

    /// Delivers a kind-specific terminal failure to every sink across every
    /// table and empties the registries atomically. Called whenever the
    /// session leaves JOINED for any reason.
    pub fn drain_all(&mut self, reason: &str) {
        for (_, sink) in self.pending_subscriptions.drain() {
            let _ = sink.send(SubscriptionEvent::SubscriptionFailed(reason.to_string()));
        }
        for (_, (_, sink)) in self.pending_unsubscriptions.drain() {
            let _ = sink.send(SubscriptionEvent::UnsubscriptionFailed(reason.to_string()));
        }
        for (_, sink) in self.subscriptions.drain() {
            let _ = sink.send(SubscriptionEvent::SubscriptionFailed(reason.to_string()));
        }

        for (_, sink) in self.pending_registrations.drain() {
            let _ = sink.send(CalleeEvent::RegistrationFailed(reason.to_string()));
        }
        for (_, (_, sink)) in self.pending_unregistrations.drain() {
            let _ = sink.send(CalleeEvent::UnregistrationFailed(reason.to_string()));
        }
        for (_, sink) in self.registrations.drain() {
            let _ = sink.send(CalleeEvent::RegistrationFailed(reason.to_string()));
        }

        for (_, sink) in self.pending_calls.drain() {
            let _ = sink.send(CallerEvent::CallFailed {
                error: reason.to_string(),
                arguments: None,
                arguments_kw: None,
            });
        }
        for (_, sink) in self.pending_publications.drain() {
            let _ = sink.send(PublicationEvent::PublicationFailed(reason.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn drain_all_delivers_terminal_event_and_empties_tables() {
        let mut reg = Registries::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        reg.pending_subscriptions.insert(1, tx);

        reg.drain_all("session aborted");

        assert!(reg.is_empty());
        match rx.recv().await.unwrap() {
            SubscriptionEvent::SubscriptionFailed(reason) => assert_eq!(reason, "session aborted"),
            other => panic!("wrong event: {:?}", other),
        }
        assert!(rx.recv().await.is_none());
    }
}
