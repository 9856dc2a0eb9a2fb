use std::time::{Duration, Instant};

/// Fixed-window bookkeeping. Only fresh calls are recorded; the caller
/// enforces the bound.
#[derive(Debug, Clone)]
pub struct WindowCounter {
    period: Duration,
    max_calls: u32,
    count: u32,
    start: Instant,
}

impl WindowCounter {
    pub fn new(max_calls: u32, period: Duration, start: Instant) -> Self {
        Self {
            period,
            max_calls,
            count: 0,
            start,
        }
    }

    pub fn should_reset(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.start) >= self.period
    }

    pub fn reset(&mut self, now: Instant) {
        self.count = 0;
        if now > self.start {
            self.start = now;
        }
    }

    pub fn record_call(&mut self) {
        self.count = self.count.saturating_add(1);
    }

    pub fn is_over_limit(&self) -> bool {
        self.count > self.max_calls
    }

    /// Time left in the current window as seen from `now`.
    pub fn remaining(&self, now: Instant) -> Duration {
        self.period
            .saturating_sub(now.saturating_duration_since(self.start))
    }

    pub fn call_count(&self) -> u32 {
        self.count
    }

    pub fn max_calls(&self) -> u32 {
        self.max_calls
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn window_start(&self) -> Instant {
        self.start
    }
}
