//! Exponential reconnect backoff.
//!
//! Starts at the configured initial delay, doubles per failed attempt and
//! saturates at the cap.  Never gives up; a successful connect resets it.

use core::time::Duration;

#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    next: Duration,
    attempts: u32,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            next: initial,
            attempts: 0,
        }
    }

    /// Delay before the next attempt; advances the schedule.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = self.next.saturating_mul(2).min(self.max);
        self.attempts = self.attempts.saturating_add(1);
        delay
    }

    pub fn reset(&mut self) {
        self.next = self.initial;
        self.attempts = 0;
    }

    /// Attempts scheduled since the last reset.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}
