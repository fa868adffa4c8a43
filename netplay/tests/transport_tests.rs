mod common;

use ::common::{Lane, Message, Mode, Note, TimingConfig};
use anyhow::Result;
use netplay::{Connection, ConnectionError, LinkState, Listener, PlayerSession, TransportError};
use std::net::{Ipv4Addr, SocketAddr};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::time::{Duration, timeout};

use crate::common::RawPeer;

fn loopback(port: u16) -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, port))
}

fn notes_message(seed: u64, count: usize) -> Message {
    Message::notes(
        (0..count)
            .map(|i| Note::new(Lane::new(i % 4).unwrap(), seed * 1000 + i as u64 * 37))
            .collect(),
    )
}

async fn accept_raw(listener: &TcpListener) -> Result<RawPeer> {
    let (stream, _) = listener.accept().await?;
    Ok(RawPeer::from_stream(stream))
}

#[tokio::test]
async fn test_listener_hands_over_exactly_one_peer() -> Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    let mut listener = Listener::bind(0).await?;
    let port = listener.port();
    assert!(listener.poll_peer()?.is_none());

    let dialed = Connection::connect("127.0.0.1", port, Duration::from_secs(5)).await?;
    let accepted = timeout_test!(Duration::from_secs(5), listener.accept())?;

    assert_eq!(accepted.peer_addr(), dialed.local_addr());
    assert!(accepted.is_connected());
    assert!(dialed.is_connected());
    assert!(!listener.is_open());
    assert!(listener.poll_peer()?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_poll_peer_never_blocks() -> Result<()> {
    let mut listener = Listener::bind(0).await?;
    let port = listener.port();

    let _dialed = Connection::connect("127.0.0.1", port, Duration::from_secs(5)).await?;
    let accepted = timeout_test!(Duration::from_secs(5), async {
        loop {
            if let Some(connection) = listener.poll_peer()? {
                return Ok::<_, ConnectionError>(connection);
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })?;
    assert!(accepted.is_connected());
    Ok(())
}

#[tokio::test]
async fn test_messages_arrive_in_order() -> Result<()> {
    let mut listener = Listener::bind(0).await?;
    let mut dialed = Connection::connect("127.0.0.1", listener.port(), Duration::from_secs(5)).await?;
    let accepted = listener.accept().await?;

    let sent: Vec<Message> = (0..10).map(|i| notes_message(i, i as usize)).collect();
    for message in &sent {
        accepted.send(message.clone())?;
    }

    let mut received = Vec::new();
    while received.len() < sent.len() {
        let message = timeout_test!(Duration::from_secs(5), dialed.recv());
        received.push(message.ok_or_else(|| anyhow::anyhow!("Connection closed"))?);
    }
    assert_eq!(received, sent);
    Ok(())
}

#[tokio::test]
async fn test_partial_writes_are_reassembled() -> Result<()> {
    let server = TcpListener::bind(loopback(0)).await?;
    let port = server.local_addr()?.port();
    let mut connection = Connection::connect("127.0.0.1", port, Duration::from_secs(5)).await?;
    let mut peer = accept_raw(&server).await?;

    let sent: Vec<Message> = (1..=5).map(|i| notes_message(i, 3)).collect();
    let mut wire = Vec::new();
    for message in &sent {
        wire.extend_from_slice(message.to_line()?.as_bytes());
    }
    peer.write_chunked(&wire, 5).await?;

    for expected in &sent {
        let message = timeout_test!(Duration::from_secs(5), connection.recv());
        assert_eq!(message.as_ref(), Some(expected));
    }
    Ok(())
}

#[tokio::test]
async fn test_malformed_and_unknown_frames_are_skipped() -> Result<()> {
    let server = TcpListener::bind(loopback(0)).await?;
    let port = server.local_addr()?.port();
    let mut connection = Connection::connect("127.0.0.1", port, Duration::from_secs(5)).await?;
    let mut peer = accept_raw(&server).await?;

    let good = notes_message(7, 2);
    let mut wire = Vec::new();
    wire.extend_from_slice(b"{\"type\": \"notes\", \"notes\": [\n");
    wire.extend_from_slice(b"{\"type\": \"notes\", \"notes\": [{\"lane\": 9, \"timestamp\": 1}]}\n");
    wire.extend_from_slice(b"{\"type\": \"ping\", \"at\": 5}\n");
    wire.extend_from_slice(&[0xff, 0xfe, b'\n']);
    wire.extend_from_slice(good.to_line()?.as_bytes());
    peer.write_raw(&wire).await?;

    let message = timeout_test!(Duration::from_secs(5), connection.recv());
    assert_eq!(message, Some(good));
    assert!(connection.is_connected());
    assert!(connection.try_recv().is_none());
    Ok(())
}

#[tokio::test]
async fn test_peer_close_marks_link_disconnected() -> Result<()> {
    let server = TcpListener::bind(loopback(0)).await?;
    let port = server.local_addr()?.port();
    let connection = Connection::connect("127.0.0.1", port, Duration::from_secs(5)).await?;
    let peer = accept_raw(&server).await?;

    peer.shutdown().await?;
    timeout_test!(Duration::from_secs(5), connection.closed());

    assert_eq!(connection.state(), LinkState::Disconnected);
    assert!(matches!(
        connection.send(notes_message(1, 1)),
        Err(TransportError::Closed)
    ));
    Ok(())
}

#[tokio::test]
async fn test_close_stops_background_tasks() -> Result<()> {
    let server = TcpListener::bind(loopback(0)).await?;
    let port = server.local_addr()?.port();
    let connection = Connection::connect("127.0.0.1", port, Duration::from_secs(5)).await?;
    let mut peer = accept_raw(&server).await?;

    connection.close();
    timeout_test!(Duration::from_secs(5), connection.closed());
    assert!(!connection.is_connected());

    // The write half is shut down, so the peer sees end of stream.
    assert!(peer.read_line().await.is_err());
    Ok(())
}

#[tokio::test]
async fn test_sent_message_matches_wire_format() -> Result<()> {
    let server = TcpListener::bind(loopback(0)).await?;
    let port = server.local_addr()?.port();
    let connection = Connection::connect("127.0.0.1", port, Duration::from_secs(5)).await?;
    let mut peer = accept_raw(&server).await?;

    connection.send(Message::notes(vec![
        Note::new(Lane::new(0).unwrap(), 0),
        Note::new(Lane::new(2).unwrap(), 480),
    ]))?;

    let line = peer.read_line().await?;
    assert_eq!(
        line,
        "{\"type\":\"notes\",\"notes\":[{\"lane\":0,\"timestamp\":0},{\"lane\":2,\"timestamp\":480}]}\n"
    );
    Ok(())
}

#[tokio::test]
async fn test_connect_refused_is_reported() -> Result<()> {
    // Grab a free port, then release it so nothing is listening there.
    let port = {
        let probe = TcpListener::bind(loopback(0)).await?;
        probe.local_addr()?.port()
    };

    let result = Connection::connect("127.0.0.1", port, Duration::from_secs(5)).await;
    assert!(matches!(result, Err(ConnectionError::Dial { .. })));
    Ok(())
}

/// A listener that never accepts, dialed until its accept queue is full, so further
/// handshakes go unanswered.
async fn saturated_listener() -> Result<(TcpListener, Vec<TcpStream>)> {
    let socket = TcpSocket::new_v4()?;
    socket.bind(loopback(0))?;
    let listener = socket.listen(1)?;
    let addr = listener.local_addr()?;

    let mut held = Vec::new();
    for _ in 0..32 {
        match timeout(Duration::from_millis(200), TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => held.push(stream),
            Ok(Err(err)) => anyhow::bail!("Filling accept queue failed: {}", err),
            Err(_) => return Ok((listener, held)),
        }
    }
    anyhow::bail!("Accept queue never filled")
}

#[tokio::test]
async fn test_unanswered_dial_times_out() -> Result<()> {
    let (listener, _held) = saturated_listener().await?;
    let port = listener.local_addr()?.port();

    let result = Connection::connect("127.0.0.1", port, Duration::from_millis(50)).await;
    assert!(matches!(result, Err(ConnectionError::TimedOut { .. })));

    let mut player = PlayerSession::new(TimingConfig::default());
    let result = player
        .connect("127.0.0.1", port, Duration::from_millis(50))
        .await;
    assert!(matches!(result, Err(ConnectionError::TimedOut { .. })));
    assert_eq!(player.mode(), Mode::Idle);
    assert!(!player.peer_connected());
    assert!(
        player
            .status()
            .notice
            .is_some_and(|notice| notice.starts_with("Not connected"))
    );
    Ok(())
}

#[tokio::test]
async fn test_closed_listener_reports_closed() -> Result<()> {
    let mut listener = Listener::bind(0).await?;
    listener.close();

    let result = timeout(Duration::from_secs(5), listener.accept()).await?;
    assert!(matches!(result, Err(ConnectionError::ListenerClosed)));
    Ok(())
}
