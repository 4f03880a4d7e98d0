//! The narrow transport collaborator the session core is built against.
//! The transport itself — and any particular WebSocket library — is
//! explicitly out of scope for the core; this module only fixes the
//! contract and ships one default adapter.

use async_trait::async_trait;
use quick_error::*;

pub mod websocket;
pub use websocket::WebSocketTransport;

/// One inbound occurrence the transport hands to the session. This is a
/// pull-based alternative to an `onText`/`onBinary`/`onClosing`/`onClosed`/
/// `onFailure` callback contract: the session's event loop calls
/// `Transport::recv` in a loop instead of being called into, which keeps the
/// evaluator a single `select!` over two channels. There is no `onOpen`
/// variant because a `Transport` value only exists once connected.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    Text(String),
    Binary(Vec<u8>),
    Closing(u16, String),
    Closed(u16, String),
    Failed(String),
}

/// Session-to-transport contract: send a text frame, or close the
/// connection. Consumed by the core as `Box<dyn Transport + Send>`.
#[async_trait]
pub trait Transport {
    /// Sends a single `wamp.2.json` text frame.
    async fn send(&mut self, text: &str) -> Result<(), TransportError>;
    /// Initiates (or completes) the close handshake with the given
    /// WebSocket close code and optional reason.
    async fn close(&mut self, code: u16, reason: Option<String>) -> Result<(), TransportError>;
    /// Waits for the next inbound occurrence.
    async fn recv(&mut self) -> TransportEvent;
}

quick_error! {
    #[derive(Debug)]
    pub enum TransportError {
        ConnectionFailed {
            display("Failed to negotiate connection with the server")
        }
        SendFailed {
            display("Failed to send message to peer")
        }
        ReceiveFailed {
            display("Failed to receive message from peer")
        }
        SubprotocolNotAccepted {
            display("The server did not accept the wamp.2.json subprotocol")
        }
    }
}
