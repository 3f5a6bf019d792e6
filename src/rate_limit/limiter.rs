// SPDX-License-Identifier: Apache-2.0

//! Per-source rate limiter.
//!
//! One token bucket per throttled source, each behind its own lock so that
//! the refill, the allow/deny decision and the decrement happen atomically
//! per source without serializing unrelated sources.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::warn;

use crate::engine::error::{GatewayError, GatewayResult};

use super::token_bucket::{TokenBucket, DEFAULT_REFILL_INTERVAL};

pub struct RateLimiter {
    buckets: HashMap<String, Mutex<TokenBucket>>,
}

impl RateLimiter {
    /// Builds one full bucket per `(source, rate_per_second)` entry.
    ///
    /// A rate of 0 means "not throttled" and creates no bucket.
    pub fn new(limits: &HashMap<String, u32>) -> Self {
        Self::with_interval(limits, DEFAULT_REFILL_INTERVAL)
    }

    pub fn with_interval(limits: &HashMap<String, u32>, refill_interval: Duration) -> Self {
        let now = Instant::now();
        let buckets = limits
            .iter()
            .filter(|(_, rate)| **rate > 0)
            .map(|(source, rate)| {
                (
                    source.clone(),
                    Mutex::new(TokenBucket::with_interval(*rate, refill_interval, now)),
                )
            })
            .collect();
        Self { buckets }
    }

    /// Returns true if a request against `source` may proceed now.
    pub fn try_acquire(&self, source: &str) -> bool {
        match self.buckets.get(source) {
            Some(bucket) => bucket.lock().consume(),
            None => true,
        }
    }

    /// Like `try_acquire`, but fails fast with `RateLimitExhausted`.
    pub fn check(&self, source: &str) -> GatewayResult<()> {
        if self.try_acquire(source) {
            Ok(())
        } else {
            warn!(source, "rate limit exhausted");
            Err(GatewayError::rate_limited(source))
        }
    }

    pub fn is_throttled(&self, source: &str) -> bool {
        self.buckets.contains_key(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::thread;

    fn limits(pairs: &[(&str, u32)]) -> HashMap<String, u32> {
        pairs.iter().map(|(s, r)| (s.to_string(), *r)).collect()
    }

    #[test]
    fn unconfigured_source_is_never_throttled() {
        let limiter = RateLimiter::new(&limits(&[("github", 1)]));
        for _ in 0..100 {
            assert!(limiter.try_acquire("jira"));
        }
        assert!(!limiter.is_throttled("jira"));
    }

    #[test]
    fn zero_rate_disables_throttling() {
        let limiter = RateLimiter::new(&limits(&[("github", 0)]));
        assert!(!limiter.is_throttled("github"));
        assert!(limiter.try_acquire("github"));
    }

    #[test]
    fn check_reports_source_and_retry_hint() {
        let limiter = RateLimiter::new(&limits(&[("github", 1)]));
        assert!(limiter.check("github").is_ok());
        let err = limiter.check("github").unwrap_err();
        assert_eq!(err, GatewayError::rate_limited("github"));
        assert_eq!(err.source_name(), Some("github"));
    }

    #[test]
    fn limiter_allows_after_interval_elapses() {
        let limiter =
            RateLimiter::with_interval(&limits(&[("k", 1)]), Duration::from_millis(5));
        assert!(limiter.try_acquire("k"));
        assert!(!limiter.try_acquire("k"));
        thread::sleep(Duration::from_millis(10));
        assert!(limiter.try_acquire("k"));
    }

    #[test]
    fn concurrent_consumers_never_exceed_capacity() {
        let limiter = Arc::new(RateLimiter::with_interval(
            &limits(&[("github", 10)]),
            Duration::from_secs(3600),
        ));
        let allowed = Arc::new(AtomicU32::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                let allowed = Arc::clone(&allowed);
                thread::spawn(move || {
                    for _ in 0..10 {
                        if limiter.try_acquire("github") {
                            allowed.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(allowed.load(Ordering::SeqCst), 10);
    }
}
