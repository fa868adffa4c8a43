use std::time::{Duration, Instant};

/// Logical session clock: milliseconds elapsed since an anchor instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clock {
    start: Instant,
}

impl Clock {
    /// Anchors a new clock at the current instant.
    pub fn start() -> Self {
        Clock { start: Instant::now() }
    }

    pub fn anchored_at(start: Instant) -> Self {
        Clock { start }
    }

    pub fn start_instant(&self) -> Instant {
        self.start
    }

    /// Milliseconds since the anchor. `Instant` is monotonic, so this never decreases.
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_at(Instant::now())
    }

    /// Milliseconds between the anchor and `now`, saturating at zero if `now` precedes it.
    pub fn elapsed_at(&self, now: Instant) -> u64 {
        let elapsed = now.saturating_duration_since(self.start);
        u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
    }
}

impl Default for Clock {
    fn default() -> Self {
        Clock::start()
    }
}

pub fn millis(ms: u64) -> Duration {
    Duration::from_millis(ms)
}
