use std::net::{Ipv4Addr, SocketAddr};

use tokio::net::{TcpListener, TcpSocket};
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::connection::Connection;
use crate::error::ConnectionError;

/// Accepts exactly one peer in the background.
///
/// The accept task hands the peer's [`Connection`] over a oneshot channel, which the
/// foreground polls once per tick with [`Listener::poll_peer`].
pub struct Listener {
    local_addr: SocketAddr,
    peer: Option<oneshot::Receiver<Connection>>,
    cancel: CancellationToken,
}

impl Listener {
    /// Binds `0.0.0.0:port`. Port 0 picks an ephemeral port.
    pub async fn bind(port: u16) -> Result<Self, ConnectionError> {
        Self::bind_addr(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port))).await
    }

    pub async fn bind_addr(addr: SocketAddr) -> Result<Self, ConnectionError> {
        let listener = bind_reusable(addr).map_err(|source| ConnectionError::Bind {
            addr: addr.to_string(),
            source,
        })?;
        let local_addr = listener.local_addr().map_err(|source| ConnectionError::Bind {
            addr: addr.to_string(),
            source,
        })?;
        info!("Listening for a peer on {}", local_addr);

        let (peer_tx, peer_rx) = oneshot::channel();
        let cancel = CancellationToken::new();
        tokio::spawn(accept_one(listener, peer_tx, cancel.clone()));

        Ok(Listener {
            local_addr,
            peer: Some(peer_rx),
            cancel,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// True until the peer has been handed over or the listener has failed.
    pub fn is_open(&self) -> bool {
        self.peer.is_some()
    }

    /// Takes the accepted peer if one has connected since the last poll. Never waits.
    pub fn poll_peer(&mut self) -> Result<Option<Connection>, ConnectionError> {
        let Some(peer) = self.peer.as_mut() else {
            return Ok(None);
        };
        match peer.try_recv() {
            Ok(connection) => {
                self.peer = None;
                Ok(Some(connection))
            }
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Closed) => {
                self.peer = None;
                Err(ConnectionError::ListenerClosed)
            }
        }
    }

    /// Waits for the peer.
    pub async fn accept(&mut self) -> Result<Connection, ConnectionError> {
        let peer = self.peer.take().ok_or(ConnectionError::ListenerClosed)?;
        peer.await.map_err(|_| ConnectionError::ListenerClosed)
    }

    pub fn close(&self) {
        self.cancel.cancel();
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn bind_reusable(addr: SocketAddr) -> std::io::Result<TcpListener> {
    let socket = match addr {
        SocketAddr::V4(_) => TcpSocket::new_v4()?,
        SocketAddr::V6(_) => TcpSocket::new_v6()?,
    };
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    socket.listen(1)
}

async fn accept_one(
    listener: TcpListener,
    peer: oneshot::Sender<Connection>,
    cancel: CancellationToken,
) {
    loop {
        let accepted = tokio::select! {
            _ = cancel.cancelled() => {
                info!("Listener closed before a peer connected");
                return;
            }
            accepted = listener.accept() => accepted,
        };

        match accepted {
            Ok((stream, addr)) => match Connection::from_stream(stream) {
                Ok(connection) => {
                    info!("Peer connected from {}", addr);
                    if peer.send(connection).is_err() {
                        warn!("Peer from {} connected after the listener was dropped", addr);
                    }
                    return;
                }
                Err(err) => {
                    warn!("Failed to set up connection from {}: {}", addr, err);
                }
            },
            Err(err) => {
                warn!("Accepting a peer failed: {}", err);
                return;
            }
        }
    }
}
