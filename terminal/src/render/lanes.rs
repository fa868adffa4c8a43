use common::{Lane, Note, LANE_COUNT};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use super::layout::PlayfieldLayout;
use crate::keymap::LANE_LABELS;

const LANE_COLORS: [Color; LANE_COUNT] = [Color::Magenta, Color::Cyan, Color::Green, Color::Red];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cell {
    Empty,
    HitLine,
    Note,
}

/// Text grid of the playfield, one column block per lane.
pub struct LaneGrid {
    cells: Vec<[Cell; LANE_COUNT]>,
    lane_width: usize,
    flashed: [bool; LANE_COUNT],
}

impl LaneGrid {
    pub fn new(rows: u16, lane_width: usize) -> Self {
        Self {
            cells: vec![[Cell::Empty; LANE_COUNT]; rows as usize],
            lane_width: lane_width.max(1),
            flashed: [false; LANE_COUNT],
        }
    }

    pub fn rows(&self) -> usize {
        self.cells.len()
    }

    pub fn cell(&self, lane: Lane, row: u16) -> Option<Cell> {
        self.cells.get(row as usize).map(|cells| cells[lane.index()])
    }

    pub fn draw_hit_line(&mut self, row: u16) {
        if let Some(cells) = self.cells.get_mut(row as usize) {
            for cell in cells.iter_mut().filter(|cell| **cell == Cell::Empty) {
                *cell = Cell::HitLine;
            }
        }
    }

    pub fn place_note(&mut self, lane: Lane, row: u16) {
        if let Some(cells) = self.cells.get_mut(row as usize) {
            cells[lane.index()] = Cell::Note;
        }
    }

    pub fn flash(&mut self, lane: Lane) {
        self.flashed[lane.index()] = true;
    }

    pub fn into_lines(self) -> Vec<Line<'static>> {
        let width = self.lane_width;
        self.cells
            .iter()
            .map(|cells| {
                let mut spans = Vec::with_capacity(LANE_COUNT * 2 + 1);
                for (lane, cell) in cells.iter().enumerate() {
                    spans.push(Span::styled("│", Style::default().fg(Color::DarkGray)));
                    spans.push(match cell {
                        Cell::Empty => Span::raw(" ".repeat(width)),
                        Cell::Note => Span::styled(
                            "█".repeat(width),
                            Style::default().fg(LANE_COLORS[lane]),
                        ),
                        Cell::HitLine if self.flashed[lane] => Span::styled(
                            "═".repeat(width),
                            Style::default()
                                .fg(Color::Yellow)
                                .add_modifier(Modifier::BOLD),
                        ),
                        Cell::HitLine => Span::styled("─".repeat(width), Style::default()),
                    });
                }
                spans.push(Span::styled("│", Style::default().fg(Color::DarkGray)));
                Line::from(spans)
            })
            .collect()
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct LaneRenderer {
    layout: PlayfieldLayout,
}

impl LaneRenderer {
    pub fn new(layout: PlayfieldLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &PlayfieldLayout {
        &self.layout
    }

    /// Lays out `notes` as seen at logical time `now` in a field `rows` tall.
    pub fn render<'a>(
        &self,
        notes: impl IntoIterator<Item = &'a Note>,
        now: u64,
        rows: u16,
        lane_width: usize,
    ) -> LaneGrid {
        let mut grid = LaneGrid::new(rows, lane_width);
        if let Some(row) = self.layout.hit_line_row(rows) {
            grid.draw_hit_line(row);
        }
        for note in notes {
            let y = self.layout.note_y(note.timestamp, now);
            if let Some(row) = self.layout.row_for(y, rows) {
                grid.place_note(note.lane, row);
            }
        }
        grid
    }
}

/// Key hints lined up under the lanes.
pub fn label_line(lane_width: usize) -> Line<'static> {
    let width = lane_width.max(1);
    let spans: Vec<Span<'static>> = LANE_LABELS
        .iter()
        .enumerate()
        .map(|(lane, label)| {
            Span::styled(
                format!(" {:^width$}", label, width = width),
                Style::default()
                    .fg(LANE_COLORS[lane])
                    .add_modifier(Modifier::BOLD),
            )
        })
        .collect();
    Line::from(spans)
}
