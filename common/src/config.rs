use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::constants::{
    GOOD_POINTS, HIT_LINE_Y, HIT_WINDOW_MS, MISS_GRACE_PX, NOTE_SPEED, PERFECT_POINTS,
    PERFECT_WINDOW_MS,
};

/// Timing tolerances and scoring used by the judgment engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub hit_window_ms: u64,
    pub perfect_window_ms: u64,
    /// A pending note is missed once `now - timestamp` exceeds this.
    pub miss_grace_ms: u64,
    pub perfect_points: u64,
    pub good_points: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            hit_window_ms: HIT_WINDOW_MS,
            perfect_window_ms: PERFECT_WINDOW_MS,
            miss_grace_ms: Self::grace_from_layout(HIT_LINE_Y, MISS_GRACE_PX, NOTE_SPEED),
            perfect_points: PERFECT_POINTS,
            good_points: GOOD_POINTS,
        }
    }
}

impl TimingConfig {
    /// Converts the distance a note may travel past the hit line into a time window.
    ///
    /// A note starts `hit_line_y / speed` ms before its timestamp at the top of the
    /// playfield and is missed after it has travelled `hit_line_y + grace_px`, so the
    /// window after the timestamp is `(hit_line_y + grace_px) / speed`.
    pub fn grace_from_layout(hit_line_y: f64, grace_px: f64, speed_px_per_ms: f64) -> u64 {
        ((hit_line_y + grace_px) / speed_px_per_ms).round() as u64
    }

    pub fn validate(&self) -> Result<()> {
        if self.perfect_window_ms > self.hit_window_ms {
            bail!(
                "perfect window ({} ms) must not exceed hit window ({} ms)",
                self.perfect_window_ms,
                self.hit_window_ms
            );
        }
        if self.miss_grace_ms < self.hit_window_ms {
            bail!(
                "miss grace ({} ms) must be at least the hit window ({} ms)",
                self.miss_grace_ms,
                self.hit_window_ms
            );
        }
        Ok(())
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read timing config: {:?}", path))?;
        let config: TimingConfig = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse timing config: {:?}", path))?;
        config.validate()?;
        Ok(config)
    }
}

/// Recorder-side limits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// Recording stops automatically once this much time has elapsed.
    pub max_duration_ms: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_grace_matches_playfield_layout() {
        // (550 + 50) / 0.3
        assert_eq!(TimingConfig::default().miss_grace_ms, 2000);
    }

    #[test]
    fn default_is_valid() {
        assert!(TimingConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_perfect_wider_than_hit() {
        let config = TimingConfig {
            perfect_window_ms: 200,
            ..TimingConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_grace_shorter_than_hit_window() {
        let config = TimingConfig {
            miss_grace_ms: 100,
            ..TimingConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: TimingConfig = serde_json::from_str(r#"{"hit_window_ms": 120}"#).unwrap();
        assert_eq!(config.hit_window_ms, 120);
        assert_eq!(config.perfect_window_ms, PERFECT_WINDOW_MS);
        assert_eq!(config.miss_grace_ms, 2000);
    }
}
