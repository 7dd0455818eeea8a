//! Signaling transports

use std::future::Future;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use super::message::SignalMessage;
use crate::error::SignalingError;

/// Bidirectional message channel to one viewer
pub trait SignalingTransport {
    /// Receive the next message; `Ok(None)` once the channel is closed
    ///
    /// Must be cancel safe: the session polls it inside `select!`.
    fn recv(&mut self)
        -> impl Future<Output = Result<Option<SignalMessage>, SignalingError>> + Send;

    /// Send one message
    fn send(&mut self, msg: SignalMessage)
        -> impl Future<Output = Result<(), SignalingError>> + Send;
}

/// Signaling over a WebSocket carrying JSON text messages
pub struct WsSignaling<S> {
    ws: WebSocketStream<S>,
}

impl<S> WsSignaling<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(ws: WebSocketStream<S>) -> Self {
        Self { ws }
    }
}

impl<S> SignalingTransport for WsSignaling<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn recv(&mut self) -> Result<Option<SignalMessage>, SignalingError> {
        loop {
            let Some(msg) = self.ws.next().await else {
                return Ok(None);
            };

            match msg? {
                Message::Text(text) => return SignalMessage::parse(&text).map(Some),
                Message::Binary(data) => {
                    let text = String::from_utf8_lossy(&data);
                    return SignalMessage::parse(&text).map(Some);
                }
                Message::Close(_) => return Ok(None),
                // Control frames are answered by tungstenite itself
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            }
        }
    }

    async fn send(&mut self, msg: SignalMessage) -> Result<(), SignalingError> {
        let json = msg.to_json()?;
        self.ws.send(Message::Text(json)).await?;
        Ok(())
    }
}
