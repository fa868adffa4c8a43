use common::{Lane, LANE_COUNT};
use crossterm::event::KeyCode;

/// Arrow glyphs shown under each lane, left to right.
pub const LANE_LABELS: [&str; LANE_COUNT] = ["←", "↓", "↑", "→"];

/// Home-row alternative for keyboards where arrows are awkward.
const HOME_ROW: [char; LANE_COUNT] = ['d', 'f', 'j', 'k'];

pub fn lane_for_key(code: KeyCode) -> Option<Lane> {
    let index = match code {
        KeyCode::Left => 0,
        KeyCode::Down => 1,
        KeyCode::Up => 2,
        KeyCode::Right => 3,
        KeyCode::Char(c) => HOME_ROW
            .iter()
            .position(|&key| key == c.to_ascii_lowercase())?,
        _ => return None,
    };
    Lane::new(index)
}
