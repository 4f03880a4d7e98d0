//! A client-side implementation of the session core of WAMP (Web
//! Application Messaging Protocol) v2, running over `wamp.2.json` text-frame
//! WebSocket. See [`Client`] for the application-facing entry point, and
//! [`session::Session`] for the state machine underneath it.

mod client;
mod codec;
mod common;
mod error;
mod events;
mod id;
mod message;
mod registry;
mod session;
mod transport;

pub use client::{Client, ClientConfig};
pub use codec::{JsonCodec, MessageCodec};
pub use common::{close_code, close_reason, is_valid_strict_uri, ClientRole};
pub use error::WampError;
pub use events::{CallOutcome, CalleeEvent, CallerEvent, PublicationEvent, Responder, SubscriptionEvent};
pub use id::{IdAllocator, RandomIdAllocator, MAX_ID};
pub use message::{InvalidMessage, Msg, WampArgs, WampDict, WampId, WampKwArgs, WampList, WampUri};
pub use registry::{CalleeSink, CallerSink, PubSink, Registries, SubSink};
pub use session::{NullListener, Session, SessionListener, SessionState, Trigger};
pub use transport::{Transport, TransportError, TransportEvent, WebSocketTransport};
