use common::{Lane, Message, Mode, Note, Recorder, RecorderConfig};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::connection::Connection;
use crate::error::{ConnectionError, TransportError};
use crate::ip_discovery::discover_local_ip;
use crate::listener::Listener;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent { notes: usize },
    /// No fresh recording to send. Nothing went on the wire.
    NothingToSend,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecorderStatus {
    pub mode: Mode,
    pub note_count: usize,
    pub peer_connected: bool,
    pub local_address: String,
    pub port: Option<u16>,
    pub send_ready: bool,
    pub notice: Option<String>,
}

/// Binds the listener for [`RecorderSession::finish_listen`] and discovers the LAN
/// address a player should dial.
pub async fn bind_listener(port: u16) -> Result<(Listener, String), ConnectionError> {
    let listener = Listener::bind(port).await?;
    let local_address = discover_local_ip().await;
    Ok((listener, local_address))
}

/// Recording side of a game: captures a note sequence and ships it to the one peer
/// that dialed in.
pub struct RecorderSession {
    recorder: Recorder,
    listener: Option<Listener>,
    connection: Option<Connection>,
    local_address: String,
    port: Option<u16>,
    send_armed: bool,
    notice: Option<String>,
}

impl RecorderSession {
    pub fn new(config: RecorderConfig) -> Self {
        RecorderSession {
            recorder: Recorder::new(config),
            listener: None,
            connection: None,
            local_address: "localhost".to_string(),
            port: None,
            send_armed: false,
            notice: None,
        }
    }

    /// Binds the peer listener on `0.0.0.0:port` and looks up the address to advertise.
    /// A failure leaves the session unbound with a "Not listening" notice; calling
    /// again retries.
    pub async fn listen(&mut self, port: u16) -> Result<(), ConnectionError> {
        if !self.begin_listen() {
            return Ok(());
        }
        let bound = bind_listener(port).await;
        self.finish_listen(bound)
    }

    /// Returns false when there is nothing to listen for: a listener is already
    /// waiting or a player is linked.
    pub fn begin_listen(&mut self) -> bool {
        if self.listener.is_some() {
            debug!("Already listening");
            return false;
        }
        if self.peer_connected() {
            debug!("Player already connected");
            return false;
        }
        true
    }

    /// Completes a bind started with [`begin_listen`](Self::begin_listen), typically
    /// run through [`bind_listener`] on another task.
    pub fn finish_listen(
        &mut self,
        bound: Result<(Listener, String), ConnectionError>,
    ) -> Result<(), ConnectionError> {
        match bound {
            Ok((listener, local_address)) => {
                self.attach_listener(listener, local_address);
                Ok(())
            }
            Err(err) => {
                warn!("Listening for a player failed: {}", err);
                self.port = None;
                self.notice = Some(format!("Not listening: {}", err));
                Err(err)
            }
        }
    }

    pub fn attach_listener(&mut self, listener: Listener, local_address: String) {
        self.port = Some(listener.port());
        self.local_address = local_address;
        self.listener = Some(listener);
        self.notice = None;
    }

    pub fn is_listening(&self) -> bool {
        self.listener.is_some()
    }

    pub fn mode(&self) -> Mode {
        if self.recorder.is_recording() {
            Mode::Recording
        } else {
            Mode::Idle
        }
    }

    pub fn peer_connected(&self) -> bool {
        self.connection
            .as_ref()
            .is_some_and(|connection| connection.is_connected())
    }

    /// Once-per-frame housekeeping: picks up the peer, watches the link and enforces
    /// the recording time limit.
    pub fn tick(&mut self) {
        self.poll_listener();
        self.poll_connection();
        if self.recorder.tick() {
            self.on_recording_stopped();
        }
    }

    fn poll_listener(&mut self) {
        let Some(listener) = self.listener.as_mut() else {
            return;
        };
        match listener.poll_peer() {
            Ok(Some(connection)) => {
                info!("Player connected from {}", connection.peer_addr());
                self.connection = Some(connection);
                self.listener = None;
                self.notice = None;
            }
            Ok(None) => {}
            Err(err) => {
                warn!("Stopped waiting for a player: {}", err);
                self.notice = Some(err.to_string());
                self.listener = None;
            }
        }
    }

    fn poll_connection(&mut self) {
        let Some(connection) = self.connection.as_mut() else {
            return;
        };
        while let Some(message) = connection.try_recv() {
            debug!("Ignoring {} message from player", message.kind());
        }
        if !connection.is_connected() {
            info!("Player {} disconnected", connection.peer_addr());
            self.connection = None;
            self.notice = Some("Player disconnected".to_string());
        }
    }

    /// Starts a fresh recording. Ignored while already recording.
    pub fn start_recording(&mut self) {
        if self.recorder.is_recording() {
            debug!("Already recording");
            return;
        }
        self.recorder.start();
        self.send_armed = false;
        self.notice = None;
        info!("Recording started");
    }

    pub fn record_press(&mut self, lane: usize) -> bool {
        match self.recorder.elapsed_ms() {
            Some(now) => self.record_press_at(lane, now),
            None => {
                debug!("Ignoring press in lane {} while not recording", lane);
                false
            }
        }
    }

    /// Records a press at `now` ms since recording start. Out-of-range lanes and
    /// presses while idle are ignored.
    pub fn record_press_at(&mut self, lane: usize, now: u64) -> bool {
        let Some(lane) = Lane::new(lane) else {
            debug!("Ignoring press in out-of-range lane {}", lane);
            return false;
        };
        let was_recording = self.recorder.is_recording();
        let recorded = self.recorder.record_press_at(lane, now);
        if was_recording && !self.recorder.is_recording() {
            self.on_recording_stopped();
        }
        recorded
    }

    /// Ends the recording. No-op if not recording.
    pub fn stop_recording(&mut self) -> bool {
        if !self.recorder.stop() {
            return false;
        }
        self.on_recording_stopped();
        true
    }

    fn on_recording_stopped(&mut self) {
        self.send_armed = !self.recorder.notes().is_empty();
    }

    /// Sends the last finished recording to the player.
    ///
    /// Each recording is sent at most once; sending again needs a new non-empty
    /// recording. Fails without consuming the recording when no player is connected.
    pub fn send(&mut self) -> Result<SendOutcome, TransportError> {
        if !self.send_armed || self.recorder.notes().is_empty() {
            debug!("Nothing to send");
            return Ok(SendOutcome::NothingToSend);
        }

        let Some(connection) = self.connection.as_ref().filter(|c| c.is_connected()) else {
            self.notice = Some("Player 2 not connected".to_string());
            return Err(TransportError::NotConnected);
        };

        let notes = self.recorder.notes().to_vec();
        let count = notes.len();
        if let Err(err) = connection.send(Message::notes(notes)) {
            warn!("Failed to send notes: {}", err);
            self.notice = Some(format!("Send failed: {}", err));
            return Err(err);
        }

        self.send_armed = false;
        self.notice = Some(format!("Sent {} notes to Player 2", count));
        info!("Sent {} notes to player", count);
        Ok(SendOutcome::Sent { notes: count })
    }

    /// Discards the recording and returns to idle. The peer link is kept.
    pub fn reset(&mut self) {
        self.recorder.clear();
        self.send_armed = false;
        self.notice = None;
        debug!("Recorder reset");
    }

    pub fn can_send(&self) -> bool {
        self.send_armed && self.peer_connected()
    }

    pub fn notes(&self) -> &[Note] {
        self.recorder.notes()
    }

    /// Milliseconds since recording started, for drawing the notes as they are laid down.
    pub fn elapsed_ms(&self) -> Option<u64> {
        self.recorder.elapsed_ms()
    }

    pub fn connection(&self) -> Option<&Connection> {
        self.connection.as_ref()
    }

    pub fn status(&self) -> RecorderStatus {
        RecorderStatus {
            mode: self.mode(),
            note_count: self.recorder.notes().len(),
            peer_connected: self.peer_connected(),
            local_address: self.local_address.clone(),
            port: self.port,
            send_ready: self.send_armed,
            notice: self.notice.clone(),
        }
    }
}
