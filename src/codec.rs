//! Seam between the session core and the wire format.
//!
//! Only `wamp.2.json` is advertised today, but the codec is kept behind a
//! trait so the session never depends on `serde_json` directly.

use crate::message::{decode, encode, InvalidMessage, Msg};

pub trait MessageCodec {
    fn encode(&self, msg: &Msg) -> String;
    fn decode(&self, text: &str) -> Result<Msg, InvalidMessage>;
    /// The `Sec-WebSocket-Protocol` token this codec speaks.
    fn subprotocol(&self) -> &'static str;
}

/// The only codec this crate ships: WAMP's JSON array encoding.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl MessageCodec for JsonCodec {
    fn encode(&self, msg: &Msg) -> String {
        encode(msg)
    }

    fn decode(&self, text: &str) -> Result<Msg, InvalidMessage> {
        decode(text)
    }

    fn subprotocol(&self) -> &'static str {
        "wamp.2.json"
    }
}
