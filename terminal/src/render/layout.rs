use common::{HIT_LINE_Y, NOTE_HEIGHT, NOTE_SPEED, PLAYFIELD_HEIGHT};

/// Maps note timestamps onto the playfield.
///
/// Positions are in playfield pixels, top at 0, so the same numbers work whatever the
/// terminal size; [`row_for`](Self::row_for) scales them down to text rows.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayfieldLayout {
    pub hit_line_y: f64,
    pub speed: f64,
    pub height: f64,
    pub note_height: f64,
}

impl Default for PlayfieldLayout {
    fn default() -> Self {
        Self {
            hit_line_y: HIT_LINE_Y,
            speed: NOTE_SPEED,
            height: PLAYFIELD_HEIGHT,
            note_height: NOTE_HEIGHT,
        }
    }
}

impl PlayfieldLayout {
    /// Milliseconds a note spends falling from the top edge to the hit line.
    pub fn travel_ms(&self) -> f64 {
        self.hit_line_y / self.speed
    }

    /// Vertical position of a note at logical time `now`. The note crosses the hit line
    /// exactly at its timestamp.
    pub fn note_y(&self, timestamp: u64, now: u64) -> f64 {
        let appear_at = timestamp as f64 - self.travel_ms();
        (now as f64 - appear_at) * self.speed
    }

    pub fn is_visible(&self, y: f64) -> bool {
        y > -self.note_height && y < self.height
    }

    /// Text row for position `y` in a field `rows` tall, or `None` when off-screen.
    /// A note still sliding in from the top is pinned to the first row.
    pub fn row_for(&self, y: f64, rows: u16) -> Option<u16> {
        if rows == 0 || !self.is_visible(y) {
            return None;
        }
        let row = (y.max(0.0) / self.height * rows as f64).floor() as u16;
        Some(row.min(rows - 1))
    }

    pub fn hit_line_row(&self, rows: u16) -> Option<u16> {
        self.row_for(self.hit_line_y, rows)
    }
}
