//! Fixed-window request counter.
//!
//! # Responsibilities
//! - Count accepted requests inside the current window
//! - Roll the window over once its duration has elapsed
//! - Report the overflow beyond the per-window cap
//!
//! # Design Decisions
//! - Pure bookkeeping; persisting the excess is the governor's job
//! - Time comes from `tokio::time::Instant` so paused-clock tests drive rollover
//! - Cap is `NonZeroU32`; a zero cap cannot be represented

use std::num::NonZeroU32;
use std::time::Duration;

use tokio::time::Instant;

/// Result of a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Requests counted in the current window, including this one.
    pub count: u32,
    /// `max(0, count - cap)`.
    pub excess: u32,
    /// True when this tick opened a new window.
    pub rolled_over: bool,
}

/// Rolling fixed-duration request window.
#[derive(Debug, Clone)]
pub struct WindowedCounter {
    cap: NonZeroU32,
    duration: Duration,
    start: Instant,
    count: u32,
    excess: u32,
}

impl WindowedCounter {
    pub fn new(cap: NonZeroU32, duration: Duration) -> Self {
        Self {
            cap,
            duration,
            start: Instant::now(),
            count: 0,
            excess: 0,
        }
    }

    /// Count one request at the current time.
    pub fn tick(&mut self) -> Tick {
        self.tick_at(Instant::now())
    }

    /// Count one request observed at `now`.
    pub fn tick_at(&mut self, now: Instant) -> Tick {
        let rolled_over = now.saturating_duration_since(self.start) >= self.duration;
        if rolled_over {
            self.reset_at(now);
        }

        self.count = self.count.saturating_add(1);
        self.excess = self.count.saturating_sub(self.cap.get());

        Tick {
            count: self.count,
            excess: self.excess,
            rolled_over,
        }
    }

    /// Start a clean window now.
    pub fn reset(&mut self) {
        self.reset_at(Instant::now());
    }

    fn reset_at(&mut self, now: Instant) {
        self.start = now;
        self.count = 0;
        self.excess = 0;
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn excess(&self) -> u32 {
        self.excess
    }
}
