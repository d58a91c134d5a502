//! Tick pacing
//!
//! A match starts at the base tick rate and speeds up by one tick per second every
//! time another increase interval of match time has passed. The engine asks for the
//! next delay exactly once after each tick body completes, so ticks never overlap.

use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct TickSchedule {
    base_rate: u32,
    increase_interval: Duration,
    started_at: Instant,
    rate: u32,
}

impl TickSchedule {
    pub fn new(base_rate: u32, increase_interval: Duration) -> Self {
        let base_rate = base_rate.max(1);
        Self {
            base_rate,
            increase_interval,
            started_at: Instant::now(),
            rate: base_rate,
        }
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Current ticks per second.
    pub fn rate(&self) -> u32 {
        self.rate
    }

    /// Tick rate after `elapsed` match time.
    pub fn rate_at(&self, elapsed: Duration) -> u32 {
        let interval = self.increase_interval.as_millis();
        if interval == 0 {
            return self.base_rate;
        }
        let steps = elapsed.as_millis() / interval;
        self.base_rate
            .saturating_add(u32::try_from(steps).unwrap_or(u32::MAX))
    }

    /// Delay between two ticks at the current rate.
    pub fn period(&self) -> Duration {
        Duration::from_millis(1000) / self.rate
    }

    /// Recomputes the rate from elapsed match time and returns the delay until the next tick.
    pub fn advance(&mut self) -> Duration {
        self.advance_at(Instant::now())
    }

    pub fn advance_at(&mut self, now: Instant) -> Duration {
        let rate = self.rate_at(now.saturating_duration_since(self.started_at));
        // Elapsed time never goes backwards, but keep the rate monotonic regardless
        self.rate = self.rate.max(rate);
        self.period()
    }
}
