//! Observable pauses.

use feedsync_engine::Pause;
use parking_lot::Mutex;
use std::time::Duration;

/// Records every requested pause instead of sleeping.
#[derive(Debug, Default)]
pub struct RecordingPause {
    pauses: Mutex<Vec<Duration>>,
}

impl RecordingPause {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the pauses requested so far, in order.
    pub fn pauses(&self) -> Vec<Duration> {
        self.pauses.lock().clone()
    }

    /// Returns the sum of all requested pauses.
    pub fn total(&self) -> Duration {
        self.pauses.lock().iter().sum()
    }

    /// Returns how often `duration` was requested.
    pub fn count_of(&self, duration: Duration) -> usize {
        self.pauses.lock().iter().filter(|d| **d == duration).count()
    }

    /// Forgets recorded pauses.
    pub fn clear(&self) {
        self.pauses.lock().clear();
    }
}

impl Pause for RecordingPause {
    fn pause(&self, duration: Duration) {
        self.pauses.lock().push(duration);
    }
}
