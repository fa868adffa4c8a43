use std::time::Duration;

use common::{
    Clock, HitOutcome, JudgmentEngine, Lane, Message, Mode, Note, NoteSequence, PlaybackResult,
    TimingConfig,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::connection::Connection;
use crate::error::ConnectionError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerStatus {
    pub mode: Mode,
    pub score: u64,
    pub combo: u32,
    pub max_combo: u32,
    /// Running accuracy while playing, final accuracy once finished.
    pub accuracy: f64,
    pub peer_connected: bool,
    pub finished: bool,
    pub notes_loaded: usize,
    pub result: Option<PlaybackResult>,
    pub notice: Option<String>,
}

/// Playback side of a game: receives a note sequence and judges live presses against it.
pub struct PlayerSession {
    config: TimingConfig,
    mode: Mode,
    engine: JudgmentEngine,
    clock: Option<Clock>,
    connection: Option<Connection>,
    result: Option<PlaybackResult>,
    notice: Option<String>,
}

impl PlayerSession {
    pub fn new(config: TimingConfig) -> Self {
        PlayerSession {
            config,
            mode: Mode::Idle,
            engine: JudgmentEngine::new(NoteSequence::default(), config),
            clock: None,
            connection: None,
            result: None,
            notice: None,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn peer_connected(&self) -> bool {
        self.connection
            .as_ref()
            .is_some_and(|connection| connection.is_connected())
    }

    /// Dials the recorder and waits for the outcome.
    pub async fn connect(
        &mut self,
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> Result<(), ConnectionError> {
        if !self.begin_connect() {
            return Ok(());
        }
        let dialed = Connection::connect(host, port, timeout).await;
        self.finish_connect(dialed)
    }

    /// Enters `WaitingForPeer` ahead of a dial running elsewhere. Returns false when a
    /// dial makes no sense right now (already linked, or mid-game).
    pub fn begin_connect(&mut self) -> bool {
        if self.peer_connected() {
            debug!("Already connected");
            return false;
        }
        if self.mode != Mode::Idle {
            debug!("Ignoring connect while {}", self.mode);
            return false;
        }
        self.mode = Mode::WaitingForPeer;
        self.notice = Some("Connecting...".to_string());
        true
    }

    /// Completes a dial started with [`begin_connect`](Self::begin_connect).
    /// A failure returns the session to `Idle` so the caller can retry.
    pub fn finish_connect(
        &mut self,
        dialed: Result<Connection, ConnectionError>,
    ) -> Result<(), ConnectionError> {
        match dialed {
            Ok(connection) => {
                info!("Connected to recorder at {}", connection.peer_addr());
                self.connection = Some(connection);
                self.notice = None;
                Ok(())
            }
            Err(err) => {
                warn!("Connecting to recorder failed: {}", err);
                if self.mode == Mode::WaitingForPeer {
                    self.mode = Mode::Idle;
                }
                self.notice = Some(format!("Not connected: {}", err));
                Err(err)
            }
        }
    }

    /// Once-per-frame update using the playback clock.
    pub fn tick(&mut self) {
        let now = self.now_ms().unwrap_or(0);
        self.tick_at(now);
    }

    /// Once-per-frame update at logical time `now`: installs any received sequence while
    /// not playing, watches the link, and sweeps expired notes while playing.
    pub fn tick_at(&mut self, now: u64) {
        if matches!(self.mode, Mode::Idle | Mode::WaitingForPeer) {
            self.drain_inbound();
        }
        self.poll_connection();
        if self.mode == Mode::Active {
            self.sweep(now);
        }
    }

    fn drain_inbound(&mut self) {
        let Some(connection) = self.connection.as_mut() else {
            return;
        };
        let mut latest = None;
        while let Some(message) = connection.try_recv() {
            match message {
                Message::Notes { notes } => latest = Some(notes),
                Message::Unknown => {}
            }
        }
        if let Some(notes) = latest {
            self.load_notes(notes);
        }
    }

    /// Replaces the current sequence. Only allowed before playback starts.
    pub fn load_notes(&mut self, notes: Vec<Note>) -> bool {
        if !matches!(self.mode, Mode::Idle | Mode::WaitingForPeer) {
            debug!("Not replacing notes while {}", self.mode);
            return false;
        }
        info!("Received {} notes", notes.len());
        self.notice = Some(format!("Received {} notes!", notes.len()));
        self.engine = JudgmentEngine::new(NoteSequence::new(notes), self.config);
        self.result = None;
        true
    }

    fn poll_connection(&mut self) {
        let Some(connection) = self.connection.as_ref() else {
            return;
        };
        if connection.is_connected() {
            return;
        }
        info!("Recorder {} disconnected", connection.peer_addr());
        self.connection = None;
        self.notice = Some("Recorder disconnected".to_string());
        if self.mode == Mode::WaitingForPeer {
            self.mode = Mode::Idle;
        }
    }

    /// Starts judging the loaded sequence from time zero. Needs a non-empty sequence
    /// and a session that is not already playing.
    pub fn start_playback(&mut self) -> bool {
        self.start_playback_with(Clock::start())
    }

    pub fn start_playback_with(&mut self, clock: Clock) -> bool {
        if !matches!(self.mode, Mode::Idle | Mode::WaitingForPeer) {
            debug!("Ignoring start while {}", self.mode);
            return false;
        }
        if self.engine.sequence().is_empty() {
            debug!("No notes to play");
            return false;
        }
        self.engine.restart();
        self.clock = Some(clock);
        self.result = None;
        self.notice = None;
        self.mode = Mode::Active;
        info!("Playback started with {} notes", self.engine.sequence().len());
        true
    }

    /// Milliseconds since playback started.
    pub fn now_ms(&self) -> Option<u64> {
        self.clock.map(|clock| clock.elapsed_ms())
    }

    pub fn on_press(&mut self, lane: usize) -> Option<HitOutcome> {
        let now = self.now_ms()?;
        self.on_press_at(lane, now)
    }

    /// Judges a press at logical time `now`. Presses outside playback or in an unknown
    /// lane are ignored.
    pub fn on_press_at(&mut self, lane: usize, now: u64) -> Option<HitOutcome> {
        if self.mode != Mode::Active {
            debug!("Ignoring press in lane {} while {}", lane, self.mode);
            return None;
        }
        let Some(lane) = Lane::new(lane) else {
            debug!("Ignoring press in out-of-range lane {}", lane);
            return None;
        };
        let outcome = self.engine.on_press(lane, now);
        self.check_finished();
        outcome
    }

    /// Marks expired notes as missed. Returns how many were missed by this call.
    pub fn sweep(&mut self, now: u64) -> usize {
        if self.mode != Mode::Active {
            return 0;
        }
        let missed = self.engine.sweep(now).len();
        self.check_finished();
        missed
    }

    fn check_finished(&mut self) {
        if self.mode != Mode::Active || !self.engine.is_complete() {
            return;
        }
        let result = self.engine.result();
        info!(
            "Playback finished: score {}, accuracy {:.1}%, max combo {}",
            result.score,
            result.accuracy * 100.0,
            result.max_combo
        );
        self.result = Some(result);
        self.mode = Mode::Finished;
    }

    /// Clears notes and score and returns to `Idle`. Resetting mid-game abandons it.
    /// The link is kept; a sequence that arrived during play is picked up next tick.
    pub fn reset(&mut self) {
        if self.mode == Mode::Active {
            info!("Playback abandoned");
        }
        self.mode = Mode::Idle;
        self.engine = JudgmentEngine::new(NoteSequence::default(), self.config);
        self.clock = None;
        self.result = None;
        self.notice = None;
    }

    pub fn notes(&self) -> &NoteSequence {
        self.engine.sequence()
    }

    pub fn engine(&self) -> &JudgmentEngine {
        &self.engine
    }

    pub fn config(&self) -> &TimingConfig {
        &self.config
    }

    pub fn connection(&self) -> Option<&Connection> {
        self.connection.as_ref()
    }

    pub fn status(&self) -> PlayerStatus {
        let stats = self.engine.stats();
        let finished = self.mode == Mode::Finished;
        PlayerStatus {
            mode: self.mode,
            score: stats.score,
            combo: stats.combo,
            max_combo: stats.max_combo,
            accuracy: if finished {
                stats.accuracy()
            } else {
                stats.running_accuracy()
            },
            peer_connected: self.peer_connected(),
            finished,
            notes_loaded: self.engine.sequence().len(),
            result: self.result,
            notice: self.notice.clone(),
        }
    }
}
