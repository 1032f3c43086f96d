//! Time and depth budget
//!
//! Pure bookkeeping over a start instant, a time limit and a depth limit.
//! Uses `tokio::time::Instant` so paused-clock tests can move time.

use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
pub struct BudgetTracker {
    started: Instant,
    time_limit: Duration,
    max_depth: u32,
}

impl BudgetTracker {
    /// Start the clock now.
    pub fn start(time_limit: Duration, max_depth: u32) -> Self {
        Self {
            started: Instant::now(),
            time_limit,
            max_depth,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Time left before the limit, zero once it has passed
    pub fn remaining(&self) -> Duration {
        self.time_limit.saturating_sub(self.elapsed())
    }

    /// Remaining time in minutes, rounded to one decimal place
    pub fn remaining_minutes(&self) -> f64 {
        (self.remaining().as_secs_f64() / 60.0 * 10.0).round() / 10.0
    }

    pub fn time_exhausted(&self) -> bool {
        self.elapsed() >= self.time_limit
    }

    pub fn depth_exhausted(&self, depth: u32) -> bool {
        depth >= self.max_depth
    }

    /// Whether another iteration may start at `depth`
    pub fn exceeded(&self, depth: u32) -> bool {
        self.time_exhausted() || self.depth_exhausted(depth)
    }
}
