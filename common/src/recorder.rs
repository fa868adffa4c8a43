use crate::clock::Clock;
use crate::config::RecorderConfig;
use crate::note::{Lane, Note};

/// Captures lane presses into a note list stamped with time since recording start.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    config: RecorderConfig,
    clock: Option<Clock>,
    notes: Vec<Note>,
}

impl Recorder {
    pub fn new(config: RecorderConfig) -> Self {
        Recorder {
            config,
            clock: None,
            notes: Vec::new(),
        }
    }

    pub fn is_recording(&self) -> bool {
        self.clock.is_some()
    }

    /// Clears previous notes and anchors the clock at the current instant.
    pub fn start(&mut self) {
        self.start_with(Clock::start());
    }

    pub fn start_with(&mut self, clock: Clock) {
        self.notes.clear();
        self.clock = Some(clock);
    }

    /// Milliseconds since recording started, if recording.
    pub fn elapsed_ms(&self) -> Option<u64> {
        self.clock.map(|clock| clock.elapsed_ms())
    }

    pub fn record_press(&mut self, lane: Lane) -> bool {
        match self.elapsed_ms() {
            Some(now) => self.record_press_at(lane, now),
            None => false,
        }
    }

    /// Appends a note at `now` ms since start. Ignored when not recording; a press past
    /// the time limit ends the recording instead. Returns whether a note was added.
    pub fn record_press_at(&mut self, lane: Lane, now: u64) -> bool {
        if !self.is_recording() {
            log::debug!("Ignoring press in lane {} while not recording", lane);
            return false;
        }
        if self.tick_at(now) {
            return false;
        }
        self.notes.push(Note::new(lane, now));
        true
    }

    /// Stops the recording once `now` has passed the configured time limit.
    /// Returns true if this call stopped it.
    pub fn tick_at(&mut self, now: u64) -> bool {
        match self.config.max_duration_ms {
            Some(limit) if self.is_recording() && now > limit => {
                log::info!("Recording passed its {} ms limit", limit);
                self.stop()
            }
            _ => false,
        }
    }

    pub fn tick(&mut self) -> bool {
        match self.elapsed_ms() {
            Some(now) => self.tick_at(now),
            None => false,
        }
    }

    /// Ends the recording. Returns false if it was not recording.
    pub fn stop(&mut self) -> bool {
        if self.clock.take().is_none() {
            return false;
        }
        log::info!("Recording stopped with {} note(s)", self.notes.len());
        true
    }

    pub fn clear(&mut self) {
        self.clock = None;
        self.notes.clear();
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }
}
