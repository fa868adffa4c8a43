use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::LANE_COUNT;

/// One of the fixed input channels, always in `0..LANE_COUNT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Lane(u8);

impl Lane {
    pub fn new(index: usize) -> Option<Lane> {
        if index < LANE_COUNT {
            Some(Lane(index as u8))
        } else {
            None
        }
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn all() -> impl Iterator<Item = Lane> {
        (0..LANE_COUNT as u8).map(Lane)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaneOutOfRange(pub u8);

impl fmt::Display for LaneOutOfRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lane {} is outside 0..{}", self.0, LANE_COUNT)
    }
}

impl TryFrom<u8> for Lane {
    type Error = LaneOutOfRange;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Lane::new(value as usize).ok_or(LaneOutOfRange(value))
    }
}

impl From<Lane> for u8 {
    fn from(lane: Lane) -> u8 {
        lane.0
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A recorded lane press, `timestamp` in milliseconds since recording start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Note {
    pub lane: Lane,
    pub timestamp: u64,
}

impl Note {
    pub fn new(lane: Lane, timestamp: u64) -> Self {
        Note { lane, timestamp }
    }

    /// Absolute distance in ms between this note and `now`.
    pub fn distance(&self, now: u64) -> u64 {
        self.timestamp.abs_diff(now)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resolution {
    Pending,
    Hit,
    Missed,
}

impl Resolution {
    pub fn is_resolved(self) -> bool {
        !matches!(self, Resolution::Pending)
    }
}

/// A note on the playback side together with its judgment state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrackedNote {
    pub note: Note,
    pub resolution: Resolution,
}

/// Notes received for playback. The recorded `(lane, timestamp)` pairs are fixed at
/// construction; only each note's resolution changes afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NoteSequence {
    notes: Vec<TrackedNote>,
}

impl NoteSequence {
    pub fn new(notes: Vec<Note>) -> Self {
        NoteSequence {
            notes: notes
                .into_iter()
                .map(|note| TrackedNote {
                    note,
                    resolution: Resolution::Pending,
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn notes(&self) -> &[TrackedNote] {
        &self.notes
    }

    pub fn get(&self, index: usize) -> Option<&TrackedNote> {
        self.notes.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackedNote> {
        self.notes.iter()
    }

    pub fn pending(&self) -> impl Iterator<Item = (usize, &TrackedNote)> {
        self.notes
            .iter()
            .enumerate()
            .filter(|(_, tracked)| tracked.resolution == Resolution::Pending)
    }

    pub fn is_fully_resolved(&self) -> bool {
        self.notes.iter().all(|tracked| tracked.resolution.is_resolved())
    }

    /// Moves a pending note into a terminal state. Resolved notes are never changed,
    /// so the return value tells the caller whether this call did anything.
    pub(crate) fn resolve(&mut self, index: usize, resolution: Resolution) -> bool {
        match self.notes.get_mut(index) {
            Some(tracked) if tracked.resolution == Resolution::Pending => {
                tracked.resolution = resolution;
                true
            }
            _ => false,
        }
    }

    /// Puts every note back to pending.
    pub fn rearm(&mut self) {
        for tracked in &mut self.notes {
            tracked.resolution = Resolution::Pending;
        }
    }

    pub fn to_notes(&self) -> Vec<Note> {
        self.notes.iter().map(|tracked| tracked.note).collect()
    }
}

impl From<Vec<Note>> for NoteSequence {
    fn from(notes: Vec<Note>) -> Self {
        NoteSequence::new(notes)
    }
}
