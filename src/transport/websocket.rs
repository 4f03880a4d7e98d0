//! Default [`Transport`] adapter: a plain `ws://` WebSocket carrying
//! `wamp.2.json` text frames. JSON-only, non-TLS; a `wss://` adapter is a
//! matter of implementing the same trait over a TLS-wrapped stream.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use log::*;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    client_async,
    tungstenite::{handshake::client::Request, protocol::CloseFrame, Message},
    WebSocketStream,
};
use url::Url;

use super::{Transport, TransportError, TransportEvent};

pub struct WebSocketTransport {
    stream: WebSocketStream<TcpStream>,
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, text: &str) -> Result<(), TransportError> {
        trace!("Send : {}", text);
        self.stream
            .send(Message::Text(text.to_string()))
            .await
            .map_err(|e| {
                error!("Failed to send on websocket : {:?}", e);
                TransportError::SendFailed
            })
    }

    async fn close(&mut self, code: u16, reason: Option<String>) -> Result<(), TransportError> {
        let frame = CloseFrame {
            code: code.into(),
            reason: reason.unwrap_or_default().into(),
        };
        // A closed/already-closing stream returning an error here is
        // expected, not a failure of our side of the handshake.
        let _ = self.stream.close(Some(frame)).await;
        Ok(())
    }

    async fn recv(&mut self) -> TransportEvent {
        loop {
            let msg = match self.stream.next().await {
                Some(Ok(m)) => m,
                Some(Err(e)) => return TransportEvent::Failed(e.to_string()),
                None => return TransportEvent::Closed(1006, "connection dropped".to_string()),
            };

            return match msg {
                Message::Text(s) => TransportEvent::Text(s),
                Message::Binary(b) => TransportEvent::Binary(b),
                Message::Ping(d) => {
                    if let Err(e) = self.stream.send(Message::Pong(d)).await {
                        return TransportEvent::Failed(format!("failed to answer ping: {}", e));
                    }
                    continue;
                }
                Message::Pong(_) => continue,
                Message::Close(frame) => {
                    let (code, reason) = match frame {
                        Some(f) => (u16::from(f.code), f.reason.to_string()),
                        None => (1000, String::new()),
                    };
                    TransportEvent::Closing(code, reason)
                }
            };
        }
    }
}

/// Connects to `url` and negotiates the `wamp.2.json` subprotocol.
pub async fn connect(url: &Url) -> Result<WebSocketTransport, TransportError> {
    let host = url.host_str().ok_or(TransportError::ConnectionFailed)?;
    let port = url.port_or_known_default().unwrap_or(80);

    let tcp = TcpStream::connect((host, port))
        .await
        .map_err(|_| TransportError::ConnectionFailed)?;

    let request = Request::builder()
        .uri(url.as_str())
        .header("Sec-WebSocket-Protocol", "wamp.2.json")
        .body(())
        .map_err(|_| TransportError::ConnectionFailed)?;

    let (stream, response) = client_async(request, tcp).await.map_err(|e| {
        error!("Websocket failed to connect : {:?}", e);
        TransportError::ConnectionFailed
    })?;

    let accepted = response
        .headers()
        .get("sec-websocket-protocol")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == "wamp.2.json")
        .unwrap_or(false);
    if !accepted {
        return Err(TransportError::SubprotocolNotAccepted);
    }

    Ok(WebSocketTransport { stream })
}
