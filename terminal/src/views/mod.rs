pub mod player_view;
pub mod recorder_view;

pub use player_view::PlayerView;
pub use recorder_view::RecorderView;

use crate::app::AppCommand;
use crate::render::{label_line, LaneGrid, LaneRenderer};
use common::{Lane, Note, LANE_COUNT};
use crossterm::event::KeyEvent;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use std::time::Duration;

pub trait View {
    fn handle_input(&mut self, key: KeyEvent) -> Option<AppCommand>;
    fn update(&mut self, dt: Duration);
    fn render(&self, frame: &mut Frame);
}

const LANE_WIDTH: usize = 5;
const FLASH_FRAMES: u8 = 10;

/// Per-lane hit-line highlight, counted down once per frame.
#[derive(Debug, Default)]
pub(crate) struct LaneFlashes([u8; LANE_COUNT]);

impl LaneFlashes {
    pub(crate) fn trigger(&mut self, lane: Lane) {
        self.0[lane.index()] = FLASH_FRAMES;
    }

    pub(crate) fn decay(&mut self) {
        for frames in self.0.iter_mut() {
            *frames = frames.saturating_sub(1);
        }
    }

    fn apply(&self, grid: &mut LaneGrid) {
        for lane in Lane::all().filter(|lane| self.0[lane.index()] > 0) {
            grid.flash(lane);
        }
    }
}

/// Splits the screen into the playfield on the left and the info column on the right.
fn split_screen(area: Rect) -> (Rect, Rect) {
    let field_width = (LANE_COUNT * (LANE_WIDTH + 1) + 1 + 2) as u16;
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .margin(1)
        .constraints([Constraint::Length(field_width), Constraint::Min(30)])
        .split(area);
    (chunks[0], chunks[1])
}

fn render_playfield<'a>(
    frame: &mut Frame,
    area: Rect,
    renderer: &LaneRenderer,
    notes: impl IntoIterator<Item = &'a Note>,
    now: Option<u64>,
    flashes: &LaneFlashes,
) {
    let block = Block::default().borders(Borders::ALL).title(" Lanes ");
    let inner = block.inner(area);
    // Bottom row holds the key labels.
    let rows = inner.height.saturating_sub(1);

    let mut grid = match now {
        Some(now) => renderer.render(notes, now, rows, LANE_WIDTH),
        None => renderer.render(std::iter::empty::<&Note>(), 0, rows, LANE_WIDTH),
    };
    flashes.apply(&mut grid);

    let mut lines = grid.into_lines();
    lines.push(label_line(LANE_WIDTH));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_info(frame: &mut Frame, area: Rect, title: &str, status: Vec<Line>, controls: Vec<Line>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(8),
            Constraint::Length(controls.len() as u16 + 2),
        ])
        .split(area);

    let status_widget = Paragraph::new(status).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" {} ", title)),
    );
    frame.render_widget(status_widget, chunks[0]);

    let controls_widget =
        Paragraph::new(controls).block(Block::default().borders(Borders::ALL).title(" Controls "));
    frame.render_widget(controls_widget, chunks[1]);
}

fn field(label: &str, value: impl Into<String>) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{:<12}", label), Style::default().fg(Color::Gray)),
        Span::styled(value.into(), Style::default().add_modifier(Modifier::BOLD)),
    ])
}

fn notice_line(notice: Option<&str>) -> Line<'static> {
    match notice {
        Some(text) => Line::from(Span::styled(
            text.to_string(),
            Style::default().fg(Color::Yellow),
        )),
        None => Line::from(""),
    }
}

fn link_label(connected: bool) -> Span<'static> {
    if connected {
        Span::styled("connected", Style::default().fg(Color::Green))
    } else {
        Span::styled("not connected", Style::default().fg(Color::Red))
    }
}
