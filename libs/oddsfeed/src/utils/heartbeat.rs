//! Heartbeat timing for periodic status logging.

use std::time::{Duration, Instant};

/// Tracks when the next periodic status line is due.
pub struct Heartbeat {
    interval: Duration,
    last_beat: Instant,
}

impl Heartbeat {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_beat: Instant::now(),
        }
    }

    /// Whether the interval has elapsed since the last beat.
    pub fn should_beat(&self) -> bool {
        self.last_beat.elapsed() >= self.interval
    }

    /// Record a beat at the current time.
    pub fn beat(&mut self) {
        self.last_beat = Instant::now();
    }
}
