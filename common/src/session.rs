use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of a game instance.
///
/// Recorder: `Idle -> Recording -> Idle`.
/// Player: `Idle -> WaitingForPeer -> Active -> Finished -> Idle` (on reset).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    #[default]
    Idle,
    Recording,
    WaitingForPeer,
    Active,
    Finished,
}

impl Mode {
    pub fn label(self) -> &'static str {
        match self {
            Mode::Idle => "IDLE",
            Mode::Recording => "RECORDING",
            Mode::WaitingForPeer => "WAITING FOR PEER",
            Mode::Active => "PLAYBACK",
            Mode::Finished => "FINISHED",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
