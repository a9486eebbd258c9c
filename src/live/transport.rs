//! Byte-pipe beneath the STOMP session: a text-message duplex behind a trait
//! so the channel can be driven without a network.

use futures::{SinkExt, StreamExt, future::BoxFuture};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, warn};

use super::error::LiveError;

/// What the transport reports upward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// One text message.
    Text(String),
    /// Clean close from the peer.
    Closed,
    /// Transport error; the connection is gone.
    Failed(String),
}

/// Both halves of an open transport. Dropping `outbound` closes the
/// connection.
#[derive(Debug)]
pub struct TransportHandle {
    /// Messages to send.
    pub outbound: mpsc::UnboundedSender<String>,
    /// Events from the peer, ending with `Closed` or `Failed`.
    pub inbound: mpsc::UnboundedReceiver<TransportEvent>,
}

/// Opens transports to the broker.
pub trait Connector: Send + Sync {
    /// Open a transport to `url`.
    fn open(&self, url: &str) -> BoxFuture<'static, Result<TransportHandle, LiveError>>;
}

/// Real transport: a WebSocket via tokio-tungstenite.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl Connector for WebSocketConnector {
    fn open(&self, url: &str) -> BoxFuture<'static, Result<TransportHandle, LiveError>> {
        let url = url.to_owned();
        Box::pin(async move {
            let (stream, _response) = connect_async(url.as_str())
                .await
                .map_err(|err| LiveError::Transport(err.to_string()))?;
            debug!(url = %url, "websocket opened");

            let (mut sink, mut source) = stream.split();
            let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
            let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<TransportEvent>();

            tokio::spawn(async move {
                while let Some(text) = outbound_rx.recv().await {
                    if let Err(err) = sink.send(Message::Text(text.into())).await {
                        warn!(error = %err, "websocket send failed");
                        break;
                    }
                }
                let _ = sink.close().await;
            });

            tokio::spawn(async move {
                while let Some(message) = source.next().await {
                    let event = match message {
                        Ok(Message::Text(text)) => TransportEvent::Text(text.as_str().to_owned()),
                        Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                            Ok(text) => TransportEvent::Text(text),
                            Err(_) => {
                                warn!("ignoring non UTF-8 binary frame");
                                continue;
                            }
                        },
                        Ok(Message::Close(_)) => {
                            let _ = inbound_tx.send(TransportEvent::Closed);
                            return;
                        }
                        Ok(_) => continue,
                        Err(err) => {
                            let _ = inbound_tx.send(TransportEvent::Failed(err.to_string()));
                            return;
                        }
                    };
                    if inbound_tx.send(event).is_err() {
                        return;
                    }
                }
                let _ = inbound_tx.send(TransportEvent::Closed);
            });

            Ok(TransportHandle {
                outbound: outbound_tx,
                inbound: inbound_rx,
            })
        })
    }
}
