use crossterm::event::{KeyCode, KeyEvent};
use netplay::{bind_listener, ConnectionError, Listener, RecorderSession, SendOutcome};
use ratatui::{
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

type BindResult = Result<(Listener, String), ConnectionError>;

/// Player 1 screen: record presses and send them to the connected player.
pub struct RecorderView {
    session: RecorderSession,
    port: u16,
    bind: Option<oneshot::Receiver<BindResult>>,
    renderer: LaneRenderer,
    flashes: LaneFlashes,
}

impl RecorderView {
    pub fn new(session: RecorderSession, port: u16) -> Self {
        Self {
            session,
            port,
            bind: None,
            renderer: LaneRenderer::default(),
            flashes: LaneFlashes::default(),
        }
    }

    pub fn session(&self) -> &RecorderSession {
        &self.session
    }

    /// Binds the player listener in the background; the result is picked up in
    /// `update`. Must be called from within the tokio runtime.
    pub fn listen(&mut self) {
        if self.bind.is_some() || !self.session.begin_listen() {
            return;
        }
        info!("Binding player listener on port {}", self.port);

        let (tx, rx) = oneshot::channel();
        let port = self.port;
        tokio::spawn(async move {
            let _ = tx.send(bind_listener(port).await);
        });
        self.bind = Some(rx);
    }

    fn poll_bind(&mut self) {
        let Some(rx) = self.bind.as_mut() else {
            return;
        };
        match rx.try_recv() {
            Ok(bound) => {
                self.bind = None;
                // Failures land in the session notice.
                let _ = self.session.finish_listen(bound);
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Closed) => {
                warn!("Bind task ended without a result");
                self.bind = None;
            }
        }
    }

    fn send(&mut self) {
        match self.session.send() {
            Ok(SendOutcome::Sent { notes }) => debug!("Queued {} notes", notes),
            Ok(SendOutcome::NothingToSend) => {}
            // The session keeps the failure as its notice.
            Err(err) => debug!("Send failed: {}", err),
        }
    }

    fn status_lines(&self) -> Vec<Line<'static>> {
        let status = self.session.status();
        let address = match status.port {
            Some(port) => format!("{}:{}", status.local_address, port),
            None if self.bind.is_some() => "binding...".to_string(),
            None => "not listening".to_string(),
        };
        let elapsed = self
            .session
            .elapsed_ms()
            .map(|ms| format!("{:.1}s", ms as f64 / 1000.0))
            .unwrap_or_else(|| "-".to_string());

        vec![
            field("Mode", status.mode.label()),
            field("Notes", status.note_count.to_string()),
            field("Elapsed", elapsed),
            field("Address", address),
            Line::from(vec![Span::raw(format!("{:<12}", "Player 2")), link_label(status.peer_connected)]),
            field("Send", if self.session.can_send() { "ready" } else { "-" }),
            Line::from(""),
            notice_line(status.notice.as_deref()),
        ]
    }
}

impl View for RecorderView {
    fn handle_input(&mut self, key: KeyEvent) -> Option<AppCommand> {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Some(AppCommand::Quit),
            KeyCode::Char('r') => self.session.start_recording(),
            KeyCode::Char('s') => {
                self.session.stop_recording();
            }
            KeyCode::Enter => self.send(),
            KeyCode::Char('x') => self.session.reset(),
            KeyCode::Char('l') => self.listen(),
            code => {
                if let Some(lane) = lane_for_key(code) {
                    if self.session.record_press(lane.index()) {
                        self.flashes.trigger(lane);
                    }
                }
            }
        }
        None
    }

    fn update(&mut self, _dt: Duration) {
        self.poll_bind();
        self.session.tick();
        self.flashes.decay();
    }

    fn render(&self, frame: &mut Frame) {
        let (field_area, info_area) = split_screen(frame.area());
        render_playfield(
            frame,
            field_area,
            &self.renderer,
            self.session.notes(),
            self.session.elapsed_ms(),
            &self.flashes,
        );
        render_info(
            frame,
            info_area,
            "Recorder",
            self.status_lines(),
            vec![
                Line::from("r record   s stop   Enter send"),
                Line::from("x reset    l listen q quit"),
                Line::from("←↓↑→ / dfjk lanes"),
            ],
        );
    }
}
