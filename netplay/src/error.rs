use std::io;
use std::time::Duration;

use thiserror::Error;

/// Failure to establish a link. The caller stays "not connected" and may retry.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("failed to bind {addr}: {source}")]
    Bind { addr: String, source: io::Error },

    #[error("failed to connect to {addr}: {source}")]
    Dial { addr: String, source: io::Error },

    #[error("connecting to {addr} timed out after {timeout:?}")]
    TimedOut { addr: String, timeout: Duration },

    #[error("listener closed before a peer connected")]
    ListenerClosed,
}

/// Failure on an established link. The connection is dead afterwards.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("not connected")]
    NotConnected,

    #[error("connection closed")]
    Closed,

    #[error("outbound queue is full")]
    QueueFull,

    #[error("failed to encode message: {0}")]
    Encode(#[from] common::ProtocolError),

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}
