use crossterm::event::{KeyCode, KeyEvent};
use common::{HitOutcome, Judgment, Lane, Mode, Note};
use netplay::{Connection, ConnectionError, PlayerSession};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
    Frame,
};
use std::time::Duration;
use tokio::sync::oneshot::{self, error::TryRecvError};
use tracing::{debug, info, warn};

use super::{field, link_label, notice_line, render_info, render_playfield, split_screen, LaneFlashes, View};
use crate::app::AppCommand;
use crate::keymap::lane_for_key;
use crate::render::LaneRenderer;

type DialResult = Result<Connection, ConnectionError>;

/// Player 2 screen: dial the recorder, play back what it sends and keep score.
pub struct PlayerView {
    session: PlayerSession,
    host: String,
    port: u16,
    connect_timeout: Duration,
    dial: Option<oneshot::Receiver<DialResult>>,
    renderer: LaneRenderer,
    flashes: LaneFlashes,
    last_hit: Option<HitOutcome>,
}

impl PlayerView {
    pub fn new(session: PlayerSession, host: String, port: u16, connect_timeout: Duration) -> Self {
        Self {
            session,
            host,
            port,
            connect_timeout,
            dial: None,
            renderer: LaneRenderer::default(),
            flashes: LaneFlashes::default(),
            last_hit: None,
        }
    }

    pub fn session(&self) -> &PlayerSession {
        &self.session
    }

    /// Starts a dial in the background; the result is picked up in `update`.
    /// Must be called from within the tokio runtime.
    pub fn connect(&mut self) {
        if self.dial.is_some() || !self.session.begin_connect() {
            return;
        }
        info!("Dialing recorder at {}:{}", self.host, self.port);

        let (tx, rx) = oneshot::channel();
        let host = self.host.clone();
        let port = self.port;
        let timeout = self.connect_timeout;
        tokio::spawn(async move {
            let dialed = Connection::connect(&host, port, timeout).await;
            let _ = tx.send(dialed);
        });
        self.dial = Some(rx);
    }

    fn poll_dial(&mut self) {
        let Some(rx) = self.dial.as_mut() else {
            return;
        };
        match rx.try_recv() {
            Ok(dialed) => {
                self.dial = None;
                // Failures land in the session notice.
                let _ = self.session.finish_connect(dialed);
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Closed) => {
                warn!("Dial task ended without a result");
                self.dial = None;
                self.session.reset();
            }
        }
    }

    fn press(&mut self, lane: Lane) {
        if let Some(hit) = self.session.on_press(lane.index()) {
            self.flashes.trigger(lane);
            self.last_hit = Some(hit);
        }
    }

    fn reset(&mut self) {
        self.session.reset();
        self.last_hit = None;
    }

    fn status_lines(&self) -> Vec<Line<'static>> {
        let status = self.session.status();
        let mut lines = vec![
            field("Mode", status.mode.label()),
            Line::from(vec![Span::raw(format!("{:<12}", "Recorder")), link_label(status.peer_connected)]),
            field("Notes", status.notes_loaded.to_string()),
            field("Score", status.score.to_string()),
            field("Combo", format!("{} (max {})", status.combo, status.max_combo)),
            field("Accuracy", format!("{:.1}%", status.accuracy * 100.0)),
            judgment_line(self.last_hit),
        ];

        if let Some(result) = status.result {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                format!(
                    "Finished: {} hit, {} missed of {}",
                    result.hits, result.misses, result.total_notes
                ),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )));
        }
        lines.push(Line::from(""));
        lines.push(notice_line(status.notice.as_deref()));
        lines
    }
}

fn judgment_line(hit: Option<HitOutcome>) -> Line<'static> {
    let Some(hit) = hit else {
        return Line::from("");
    };
    let (label, color) = match hit.judgment {
        Judgment::Perfect => ("PERFECT", Color::Yellow),
        Judgment::Good => ("GOOD", Color::Green),
    };
    Line::from(vec![
        Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD)),
        Span::raw(format!(" +{} ({} ms)", hit.points, hit.distance_ms)),
    ])
}

impl View for PlayerView {
    fn handle_input(&mut self, key: KeyEvent) -> Option<AppCommand> {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Some(AppCommand::Quit),
            KeyCode::Char('c') => self.connect(),
            KeyCode::Char('p') | KeyCode::Enter => {
                if self.session.start_playback() {
                    self.last_hit = None;
                } else {
                    debug!("Playback not started in {}", self.session.mode());
                }
            }
            KeyCode::Char('x') => self.reset(),
            code => {
                if let Some(lane) = lane_for_key(code) {
                    self.press(lane);
                }
            }
        }
        None
    }

    fn update(&mut self, _dt: Duration) {
        self.poll_dial();
        self.session.tick();
        self.flashes.decay();
    }

    fn render(&self, frame: &mut Frame) {
        let (field_area, info_area) = split_screen(frame.area());
        let now = match self.session.mode() {
            Mode::Active => self.session.now_ms(),
            _ => None,
        };
        let pending: Vec<&Note> = self
            .session
            .notes()
            .pending()
            .map(|(_, tracked)| &tracked.note)
            .collect();
        render_playfield(frame, field_area, &self.renderer, pending, now, &self.flashes);
        render_info(
            frame,
            info_area,
            "Player",
            self.status_lines(),
            vec![
                Line::from("c connect   p/Enter play   x reset"),
                Line::from("q quit      ←↓↑→ / dfjk lanes"),
            ],
        );
    }
}
