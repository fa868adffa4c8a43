/// Number of input lanes. Lane indices on the wire are `0..LANE_COUNT`.
pub const LANE_COUNT: usize = 4;

/// Default TCP port the recorder listens on
pub const DEFAULT_PORT: u16 = 12345;

/// Default host the player dials
pub const DEFAULT_HOST: &str = "localhost";

/// Foreground tick interval in milliseconds (~60 Hz)
pub const TICK_INTERVAL_MS: u64 = 16;

/// Maximum distance between a press and a note for it to count as a hit
pub const HIT_WINDOW_MS: u64 = 150;

/// Presses within this distance score the full base points
pub const PERFECT_WINDOW_MS: u64 = 50;

pub const PERFECT_POINTS: u64 = 100;
pub const GOOD_POINTS: u64 = 50;

/// Playfield layout, in pixels and pixels per millisecond. The default miss grace is derived from it.
pub const HIT_LINE_Y: f64 = 550.0;
pub const NOTE_SPEED: f64 = 0.3;
pub const PLAYFIELD_HEIGHT: f64 = 600.0;
pub const NOTE_HEIGHT: f64 = 30.0;

/// How far past the hit line a note travels before it counts as missed
pub const MISS_GRACE_PX: f64 = 50.0;

/// Longest single protocol line accepted by the receiver
pub const MAX_FRAME_BYTES: usize = 1024 * 1024;
