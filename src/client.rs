//! The application-facing facade: a thin wrapper spawning a [`Session`]
//! and its event loop, translating the blocking `join`/`leave`/`shutdown`
//! calls into a wait on a lifecycle channel bridged from [`SessionListener`].

use std::collections::HashSet;

use log::*;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::common::ClientRole;
use crate::error::WampError;
use crate::events::{CalleeEvent, CallerEvent, PublicationEvent, SubscriptionEvent};
use crate::id::RandomIdAllocator;
use crate::message::{WampArgs, WampId, WampKwArgs};
use crate::session::{Session, SessionListener, Trigger};
use crate::transport::websocket;

/// Options controlling how a [`Client`] joins the router. No serializer
/// negotiation (only `wamp.2.json` is shipped) and no authentication
/// fields (out of scope).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    agent: Option<String>,
    roles: HashSet<ClientRole>,
}

impl Default for ClientConfig {
    /// All four roles advertised, and the default agent string (HELLO's
    /// roles advertisement).
    fn default() -> Self {
        ClientConfig {
            agent: Some(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string()),
            roles: [
                ClientRole::Publisher,
                ClientRole::Subscriber,
                ClientRole::Caller,
                ClientRole::Callee,
            ]
            .iter()
            .cloned()
            .collect(),
        }
    }
}

impl ClientConfig {
    /// Replaces the default agent string. Pass an empty string to omit the
    /// `agent` key from HELLO's details entirely.
    pub fn set_agent<T: AsRef<str>>(mut self, agent: T) -> Self {
        let agent = agent.as_ref();
        self.agent = if agent.is_empty() {
            None
        } else {
            Some(agent.to_string())
        };
        self
    }

    pub fn get_agent(&self) -> Option<&str> {
        self.agent.as_deref()
    }

    /// Restricts the roles advertised in HELLO to exactly this set.
    pub fn set_roles(mut self, roles: Vec<ClientRole>) -> Self {
        self.roles = roles.into_iter().collect();
        self
    }

    pub fn get_roles(&self) -> &HashSet<ClientRole> {
        &self.roles
    }
}

/// Lifecycle notifications bridged from [`SessionListener`] to the
/// [`Client`]'s internal event loop.
#[derive(Debug)]
enum ClientEvent {
    RealmJoined(String),
    RealmLeft(String, bool),
    SessionShutdown,
    SessionAborted(String),
}

struct ChannelListener {
    tx: UnboundedSender<ClientEvent>,
}

impl SessionListener for ChannelListener {
    fn on_realm_joined(&mut self, realm: &str) {
        let _ = self.tx.send(ClientEvent::RealmJoined(realm.to_string()));
    }
    fn on_realm_left(&mut self, realm: &str, from_router: bool) {
        let _ = self
            .tx
            .send(ClientEvent::RealmLeft(realm.to_string(), from_router));
    }
    fn on_session_shutdown(&mut self) {
        let _ = self.tx.send(ClientEvent::SessionShutdown);
    }
    fn on_session_aborted(&mut self, reason: &str, _error: Option<&WampError>) {
        let _ = self.tx.send(ClientEvent::SessionAborted(reason.to_string()));
    }
}

/// Allows interaction as a client with a WAMP router.
pub struct Client {
    ctl: UnboundedSender<Trigger>,
    events: UnboundedReceiver<ClientEvent>,
    joined: bool,
}

impl Client {
    /// Connects to a router at `uri` (a `ws://host:port/path` URL) and
    /// spawns its session event loop as a self-driving background task —
    /// there is no reason for the caller to own that future directly.
    pub async fn connect<T: AsRef<str>>(
        uri: T,
        cfg: Option<ClientConfig>,
    ) -> Result<Client, WampError> {
        let url = url::Url::parse(uri.as_ref()).map_err(WampError::InvalidUri)?;
        if url.host_str().is_none() {
            return Err(WampError::NoHostInUri);
        }

        let config = cfg.unwrap_or_default();
        let transport = websocket::connect(&url).await?;

        let (ctl_tx, ctl_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let listener = Box::new(ChannelListener { tx: event_tx });

        let session = Session::new(
            Box::new(transport),
            Box::new(crate::codec::JsonCodec),
            Box::new(RandomIdAllocator::new()),
            config.roles,
            config.agent,
            listener,
            ctl_tx.clone(),
        );

        tokio::spawn(session.run(ctl_rx));

        Ok(Client {
            ctl: ctl_tx,
            events: event_rx,
            joined: false,
        })
    }

    /// Joins `realm` and waits for the router's WELCOME (or for the session
    /// to abort while joining).
    pub async fn join_realm<T: Into<String>>(&mut self, realm: T) -> Result<(), WampError> {
        let realm = realm.into();
        self.send(Trigger::Join { realm: realm.clone() })?;

        match self.events.recv().await {
            Some(ClientEvent::RealmJoined(_)) => {
                self.joined = true;
                Ok(())
            }
            Some(ClientEvent::SessionAborted(reason)) => {
                Err(WampError::SessionAborted(reason))
            }
            Some(other) => Err(WampError::UnknownError(format!(
                "unexpected lifecycle event while joining: {:?}",
                other
            ))),
            None => Err(WampError::ClientDied),
        }
    }

    /// Leaves the current realm, or does nothing if not currently joined.
    pub async fn leave_realm(&mut self) -> Result<(), WampError> {
        if !self.joined {
            return Ok(());
        }
        self.send(Trigger::Leave)?;

        match self.events.recv().await {
            Some(ClientEvent::RealmLeft(_, _)) => {
                self.joined = false;
                Ok(())
            }
            Some(ClientEvent::SessionAborted(reason)) => Err(WampError::SessionAborted(reason)),
            Some(other) => Err(WampError::UnknownError(format!(
                "unexpected lifecycle event while leaving: {:?}",
                other
            ))),
            None => Err(WampError::ClientDied),
        }
    }

    /// Cleanly shuts down the session and closes the transport.
    pub async fn shutdown(mut self) -> Result<(), WampError> {
        self.send(Trigger::Shutdown)?;

        match self.events.recv().await {
            Some(ClientEvent::SessionShutdown) => Ok(()),
            Some(ClientEvent::SessionAborted(reason)) => Err(WampError::SessionAborted(reason)),
            Some(other) => Err(WampError::UnknownError(format!(
                "unexpected lifecycle event while shutting down: {:?}",
                other
            ))),
            None => Err(WampError::ClientDied),
        }
    }

    /// Subscribes to `topic`, returning the receive end of its event stream
    /// immediately (the first event is `Established` or `SubscriptionFailed`;
    /// subscribe yields an event sequence, not a single future).
    pub fn subscribe<T: AsRef<str>>(
        &self,
        topic: T,
    ) -> Result<UnboundedReceiver<SubscriptionEvent>, WampError> {
        let (sink, stream) = mpsc::unbounded_channel();
        self.send(Trigger::Subscribe {
            topic: topic.as_ref().to_string(),
            sink,
        })?;
        Ok(stream)
    }

    /// Unsubscribes a previously established subscription. The outcome is
    /// delivered on the sink returned by the original `subscribe` call.
    pub fn unsubscribe(&self, subscription: WampId) -> Result<(), WampError> {
        self.send(Trigger::Unsubscribe { subscription })
    }

    /// Publishes to `topic`. If `acknowledge` is false the returned receiver
    /// closes immediately with no events (fire-and-forget).
    pub fn publish<T: AsRef<str>>(
        &self,
        topic: T,
        arguments: Option<WampArgs>,
        arguments_kw: Option<WampKwArgs>,
        acknowledge: bool,
    ) -> Result<UnboundedReceiver<PublicationEvent>, WampError> {
        let (sink, stream) = mpsc::unbounded_channel();
        self.send(Trigger::Publish {
            topic: topic.as_ref().to_string(),
            options_acknowledge: acknowledge,
            arguments,
            arguments_kw,
            sink,
        })?;
        Ok(stream)
    }

    /// Registers `procedure`, returning its event stream immediately. Each
    /// `CalleeEvent::Invocation` carries a `Responder` the consumer must call
    /// exactly once.
    pub fn register<T: AsRef<str>>(
        &self,
        procedure: T,
    ) -> Result<UnboundedReceiver<CalleeEvent>, WampError> {
        let (sink, stream) = mpsc::unbounded_channel();
        self.send(Trigger::Register {
            procedure: procedure.as_ref().to_string(),
            sink,
        })?;
        Ok(stream)
    }

    /// Unregisters a previously established registration. The outcome is
    /// delivered on the sink returned by the original `register` call.
    pub fn unregister(&self, registration: WampId) -> Result<(), WampError> {
        self.send(Trigger::Unregister { registration })
    }

    /// Calls `procedure`, returning its (single-event) result stream
    /// immediately.
    pub fn call<T: AsRef<str>>(
        &self,
        procedure: T,
        arguments: Option<WampArgs>,
        arguments_kw: Option<WampKwArgs>,
    ) -> Result<UnboundedReceiver<CallerEvent>, WampError> {
        let (sink, stream) = mpsc::unbounded_channel();
        self.send(Trigger::Call {
            procedure: procedure.as_ref().to_string(),
            arguments,
            arguments_kw,
            sink,
        })?;
        Ok(stream)
    }

    fn send(&self, trigger: Trigger) -> Result<(), WampError> {
        self.ctl.send(trigger).map_err(|_| {
            error!("Session event loop is gone; client is unusable");
            WampError::ClientDied
        })
    }
}
