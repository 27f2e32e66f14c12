//! Trial Timing
//!
//! Wall-clock measurement of a single trial, from the moment the action is
//! triggered to the moment its completion is signalled.

use std::time::{Duration, Instant};

/// Clock for measuring one trial
#[derive(Debug, Clone, Copy)]
pub struct TrialClock {
    start: Instant,
}

impl TrialClock {
    /// Start a new clock
    #[inline]
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Instant the clock was started
    pub fn started_at(&self) -> Instant {
        self.start
    }

    /// Time elapsed since start
    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Time between start and `end`; zero if `end` precedes the start
    #[inline]
    pub fn elapsed_until(&self, end: Instant) -> Duration {
        end.saturating_duration_since(self.start)
    }
}
