// SPDX-License-Identifier: Apache-2.0

//! Lazily refilled token bucket.
//!
//! There is no background timer: each `consume` first credits the whole
//! refill intervals that elapsed since the last refill. `last_refill` only
//! advances by those whole intervals, so the remainder of a partial interval
//! counts toward the next refill instead of being dropped.

use std::time::{Duration, Instant};

/// Default refill interval: the bucket refills `capacity` tokens per second.
pub const DEFAULT_REFILL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct TokenBucket {
    capacity: u32,
    tokens: u32,
    last_refill: Instant,
    refill_interval: Duration,
}

impl TokenBucket {
    /// A full bucket allowing `rate_per_second` consumptions per second.
    pub fn new(rate_per_second: u32) -> Self {
        Self::with_interval(rate_per_second, DEFAULT_REFILL_INTERVAL, Instant::now())
    }

    pub fn with_interval(capacity: u32, refill_interval: Duration, now: Instant) -> Self {
        Self {
            capacity,
            tokens: capacity,
            last_refill: now,
            // A zero interval would divide by zero below.
            refill_interval: refill_interval.max(Duration::from_millis(1)),
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn tokens(&self) -> u32 {
        self.tokens
    }

    pub fn consume(&mut self) -> bool {
        self.consume_at(Instant::now())
    }

    /// Takes one token as of `now`. Returns false when the bucket is empty.
    pub fn consume_at(&mut self, now: Instant) -> bool {
        self.refill(now);

        if self.tokens > 0 {
            self.tokens -= 1;
            true
        } else {
            false
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill);
        let intervals = elapsed.as_nanos() / self.refill_interval.as_nanos();
        if intervals == 0 {
            return;
        }

        let credit = intervals.saturating_mul(self.capacity as u128);
        self.tokens = (self.tokens as u128 + credit).min(self.capacity as u128) as u32;

        // Advance by whole intervals only. Buckets idle for longer than u32
        // intervals simply restart from `now`.
        self.last_refill = match u32::try_from(intervals) {
            Ok(n) => self.last_refill + self.refill_interval * n,
            Err(_) => now,
        };
    }
}
