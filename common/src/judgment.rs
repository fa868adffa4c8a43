use serde::{Deserialize, Serialize};

use crate::config::TimingConfig;
use crate::note::{Lane, NoteSequence, Resolution};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Judgment {
    Perfect,
    Good,
}

/// Result of a press that consumed a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitOutcome {
    pub index: usize,
    pub lane: Lane,
    pub judgment: Judgment,
    pub distance_ms: u64,
    pub points: u64,
    pub combo: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub score: u64,
    pub combo: u32,
    pub max_combo: u32,
    pub hits: u32,
    pub misses: u32,
    pub total_notes: u32,
}

impl Stats {
    /// Final accuracy: hits over every note in the sequence, 0 for an empty one.
    pub fn accuracy(&self) -> f64 {
        if self.total_notes == 0 {
            0.0
        } else {
            self.hits as f64 / self.total_notes as f64
        }
    }

    /// Accuracy over the notes judged so far, 1.0 before the first judgment.
    pub fn running_accuracy(&self) -> f64 {
        let judged = self.hits + self.misses;
        if judged == 0 {
            1.0
        } else {
            self.hits as f64 / judged as f64
        }
    }
}

/// Summary reported when every note has been hit or missed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackResult {
    pub score: u64,
    pub max_combo: u32,
    pub hits: u32,
    pub misses: u32,
    pub total_notes: u32,
    pub accuracy: f64,
}

impl From<&Stats> for PlaybackResult {
    fn from(stats: &Stats) -> Self {
        PlaybackResult {
            score: stats.score,
            max_combo: stats.max_combo,
            hits: stats.hits,
            misses: stats.misses,
            total_notes: stats.total_notes,
            accuracy: stats.accuracy(),
        }
    }
}

/// Matches presses against a note sequence and keeps score.
///
/// All times are logical milliseconds since playback start and are passed in by the
/// caller, so the same sequence of `(lane, now)` presses and sweeps always yields the
/// same score regardless of wall-clock jitter.
#[derive(Debug, Clone)]
pub struct JudgmentEngine {
    config: TimingConfig,
    sequence: NoteSequence,
    stats: Stats,
}

impl JudgmentEngine {
    pub fn new(sequence: NoteSequence, config: TimingConfig) -> Self {
        let stats = Stats {
            total_notes: sequence.len() as u32,
            ..Stats::default()
        };
        JudgmentEngine {
            config,
            sequence,
            stats,
        }
    }

    pub fn config(&self) -> &TimingConfig {
        &self.config
    }

    pub fn sequence(&self) -> &NoteSequence {
        &self.sequence
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn is_complete(&self) -> bool {
        self.sequence.is_fully_resolved()
    }

    pub fn result(&self) -> PlaybackResult {
        PlaybackResult::from(&self.stats)
    }

    /// Puts every note back to pending and clears the score.
    pub fn restart(&mut self) {
        self.sequence.rearm();
        self.stats = Stats {
            total_notes: self.sequence.len() as u32,
            ..Stats::default()
        };
    }

    /// Judges a press in `lane` at time `now`.
    ///
    /// The closest pending note in the lane within the hit window is consumed. Equal
    /// distances go to the earlier timestamp, then to the earlier position in the
    /// sequence. A press with no candidate is ignored and returns `None`.
    pub fn on_press(&mut self, lane: Lane, now: u64) -> Option<HitOutcome> {
        let (index, distance_ms) = self
            .sequence
            .pending()
            .filter(|(_, tracked)| tracked.note.lane == lane)
            .map(|(index, tracked)| (index, tracked.note.distance(now), tracked.note.timestamp))
            .filter(|&(_, distance, _)| distance <= self.config.hit_window_ms)
            .min_by_key(|&(index, distance, timestamp)| (distance, timestamp, index))
            .map(|(index, distance, _)| (index, distance))?;

        if !self.sequence.resolve(index, Resolution::Hit) {
            return None;
        }

        self.stats.hits += 1;
        self.stats.combo += 1;
        self.stats.max_combo = self.stats.max_combo.max(self.stats.combo);

        let (judgment, base_points) = if distance_ms <= self.config.perfect_window_ms {
            (Judgment::Perfect, self.config.perfect_points)
        } else {
            (Judgment::Good, self.config.good_points)
        };
        let points = combo_points(base_points, self.stats.combo);
        self.stats.score += points;

        log::debug!(
            "Hit note {} in lane {} ({:?}, {} ms off, +{} points, combo {})",
            index,
            lane,
            judgment,
            distance_ms,
            points,
            self.stats.combo
        );

        Some(HitOutcome {
            index,
            lane,
            judgment,
            distance_ms,
            points,
            combo: self.stats.combo,
        })
    }

    /// Marks every pending note that has aged past the miss grace as missed.
    /// Returns the indices of the notes missed by this call, in sequence order.
    pub fn sweep(&mut self, now: u64) -> Vec<usize> {
        let grace = self.config.miss_grace_ms;
        let expired: Vec<usize> = self
            .sequence
            .pending()
            .filter(|(_, tracked)| now.saturating_sub(tracked.note.timestamp) > grace)
            .map(|(index, _)| index)
            .collect();

        let mut missed = Vec::with_capacity(expired.len());
        for index in expired {
            if self.sequence.resolve(index, Resolution::Missed) {
                self.stats.misses += 1;
                self.stats.combo = 0;
                missed.push(index);
            }
        }

        if !missed.is_empty() {
            log::debug!("Sweep at {} ms missed {} note(s)", now, missed.len());
        }
        missed
    }
}

/// `floor(points * (1 + combo * 0.1))`, computed in integers so it is exact.
pub fn combo_points(base_points: u64, combo: u32) -> u64 {
    base_points * (10 + combo as u64) / 10
}
