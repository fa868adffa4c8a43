use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use common::Message;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};
use tokio::sync::{mpsc, watch};
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::codec::{Inbound, MessageCodec};
use crate::error::{ConnectionError, TransportError};

/// Capacity of the inbound and outbound message queues
const QUEUE_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Connected,
    Disconnected,
}

/// The single peer link of a game instance.
///
/// A reader task decodes inbound lines into a bounded queue and a writer task drains
/// the outbound queue onto the socket, so nothing here blocks the caller on I/O. Both
/// tasks stop when either side of the socket fails, when the peer closes, or when
/// the connection is closed or dropped.
pub struct Connection {
    peer_addr: SocketAddr,
    local_addr: SocketAddr,
    outbound: mpsc::Sender<Message>,
    inbound: mpsc::Receiver<Message>,
    state: watch::Receiver<LinkState>,
    cancel: CancellationToken,
}

impl Connection {
    /// Dials `host:port`, giving up after `timeout`.
    pub async fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self, ConnectionError> {
        let addr = format!("{}:{}", host, port);
        info!("Connecting to {}", addr);

        let stream = match tokio::time::timeout(timeout, TcpStream::connect(addr.as_str())).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => return Err(ConnectionError::Dial { addr, source }),
            Err(_) => return Err(ConnectionError::TimedOut { addr, timeout }),
        };

        let connection =
            Connection::from_stream(stream).map_err(|source| ConnectionError::Dial {
                addr: addr.clone(),
                source,
            })?;
        info!("Connected to {}", connection.peer_addr);
        Ok(connection)
    }

    /// Wraps an established stream and spawns its reader and writer tasks.
    /// Must be called from within a tokio runtime.
    pub fn from_stream(stream: TcpStream) -> io::Result<Self> {
        let peer_addr = stream.peer_addr()?;
        let local_addr = stream.local_addr()?;
        stream.set_nodelay(true)?;

        let (read_half, write_half) = stream.into_split();
        let (inbound_tx, inbound_rx) = mpsc::channel(QUEUE_CAPACITY);
        let (outbound_tx, outbound_rx) = mpsc::channel(QUEUE_CAPACITY);
        let (state_tx, state_rx) = watch::channel(LinkState::Connected);
        let state_tx = Arc::new(state_tx);
        let cancel = CancellationToken::new();

        tokio::spawn(read_loop(
            FramedRead::new(read_half, MessageCodec::new()),
            inbound_tx,
            state_tx.clone(),
            cancel.clone(),
            peer_addr,
        ));
        tokio::spawn(write_loop(
            FramedWrite::new(write_half, MessageCodec::new()),
            outbound_rx,
            state_tx,
            cancel.clone(),
            peer_addr,
        ));

        Ok(Connection {
            peer_addr,
            local_addr,
            outbound: outbound_tx,
            inbound: inbound_rx,
            state: state_rx,
            cancel,
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn state(&self) -> LinkState {
        *self.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == LinkState::Connected
    }

    /// Queues a message for the writer task. Fails once the link is known to be dead;
    /// a write that fails later marks the link disconnected.
    pub fn send(&self, message: Message) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::Closed);
        }
        self.outbound.try_send(message).map_err(|err| match err {
            TrySendError::Full(_) => TransportError::QueueFull,
            TrySendError::Closed(_) => TransportError::Closed,
        })
    }

    /// Next inbound message, if one has arrived. Never waits.
    pub fn try_recv(&mut self) -> Option<Message> {
        match self.inbound.try_recv() {
            Ok(message) => Some(message),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Waits for the next inbound message. `None` once the link is gone and drained.
    pub async fn recv(&mut self) -> Option<Message> {
        self.inbound.recv().await
    }

    /// Resolves once the link is disconnected.
    pub async fn closed(&self) {
        let mut state = self.state.clone();
        let _ = state
            .wait_for(|state| *state == LinkState::Disconnected)
            .await;
    }

    pub fn close(&self) {
        self.cancel.cancel();
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("peer_addr", &self.peer_addr)
            .field("local_addr", &self.local_addr)
            .field("state", &self.state())
            .finish()
    }
}

async fn read_loop(
    mut frames: FramedRead<OwnedReadHalf, MessageCodec>,
    inbound: mpsc::Sender<Message>,
    state: Arc<watch::Sender<LinkState>>,
    cancel: CancellationToken,
    peer: SocketAddr,
) {
    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => break,
            frame = frames.next() => frame,
        };

        match frame {
            Some(Ok(Inbound::Message(Message::Unknown))) => {
                debug!("Ignoring message of unknown type from {}", peer);
            }
            Some(Ok(Inbound::Message(message))) => {
                debug!("Received {} message from {}", message.kind(), peer);
                let delivered = tokio::select! {
                    _ = cancel.cancelled() => false,
                    sent = inbound.send(message) => sent.is_ok(),
                };
                if !delivered {
                    break;
                }
            }
            Some(Ok(Inbound::Malformed(err))) => {
                warn!("Dropping malformed frame from {}: {}", peer, err);
            }
            Some(Err(err)) => {
                warn!("Reading from {} failed: {}", peer, err);
                break;
            }
            None => {
                info!("Peer {} closed the connection", peer);
                break;
            }
        }
    }

    state.send_replace(LinkState::Disconnected);
    cancel.cancel();
}

async fn write_loop(
    mut sink: FramedWrite<OwnedWriteHalf, MessageCodec>,
    mut outbound: mpsc::Receiver<Message>,
    state: Arc<watch::Sender<LinkState>>,
    cancel: CancellationToken,
    peer: SocketAddr,
) {
    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => break,
            next = outbound.recv() => next,
        };

        let Some(message) = next else {
            break;
        };
        let kind = message.kind();
        let written = tokio::select! {
            _ = cancel.cancelled() => break,
            written = sink.send(message) => written,
        };
        if let Err(err) = written {
            warn!("Writing {} message to {} failed: {}", kind, peer, err);
            break;
        }
        debug!("Sent {} message to {}", kind, peer);
    }

    state.send_replace(LinkState::Disconnected);
    cancel.cancel();
    if let Err(err) = sink.close().await {
        debug!("Shutting down write half to {} failed: {}", peer, err);
    }
}
