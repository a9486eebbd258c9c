use std::time::Duration;

use thiserror::Error;

use super::frame::FrameError;

/// Failures raised by the live channel.
#[derive(Debug, Error)]
pub enum LiveError {
    /// The underlying WebSocket could not be opened or failed mid-handshake.
    #[error("live transport failure: {0}")]
    Transport(String),
    /// The broker answered the handshake with an ERROR frame.
    #[error("broker rejected the connection: {0}")]
    Broker(String),
    /// No CONNECTED frame arrived in time.
    #[error("live handshake timed out after {0:?}")]
    Timeout(Duration),
    /// The transport closed before the handshake finished.
    #[error("live transport closed")]
    Closed,
    /// The broker sent something that is not a STOMP frame.
    #[error("invalid frame from broker")]
    Frame(#[from] FrameError),
}
