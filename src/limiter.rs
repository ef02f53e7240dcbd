//! Per-target rate limiting.
//!
//! A single map of `target_id → last request time` behind one async mutex.
//! The guard is held across the sleep, so the recorded timestamp is the
//! moment the request is released and per-target intervals are a hard lower
//! bound. The cost is that all rate decisions serialize through one lock,
//! so a slow target can delay unrelated ones. Known limitation; a
//! per-target token bucket is the upgrade path.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

/// In-memory per-target request gate.
#[derive(Default)]
pub struct RateLimiter {
    last_request: Mutex<HashMap<i64, Instant>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until a request at `rate` requests/second is allowed for the
    /// target, then records the release time.
    ///
    /// `rate` must be positive; callers substitute the default rate for
    /// unset or non-positive target configuration.
    pub async fn wait(&self, target_id: i64, rate: f64) {
        let delay = Duration::from_secs_f64(1.0 / rate);
        self.wait_delay(target_id, delay).await;
    }

    /// Waits until at least `delay` has passed since the previous request
    /// for the target.
    pub async fn wait_delay(&self, target_id: i64, delay: Duration) {
        let mut last_request = self.last_request.lock().await;
        if let Some(previous) = last_request.get(&target_id) {
            let elapsed = previous.elapsed();
            if elapsed < delay {
                tokio::time::sleep(delay - elapsed).await;
            }
        }
        last_request.insert(target_id, Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_request_is_immediate() {
        let limiter = RateLimiter::new();
        let start = Instant::now();
        limiter.wait(1, 10.0).await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_second_request_waits_minimum_interval() {
        let limiter = RateLimiter::new();
        limiter.wait(1, 20.0).await; // 50ms interval
        let start = Instant::now();
        limiter.wait(1, 20.0).await;
        assert!(
            start.elapsed() >= Duration::from_millis(45),
            "second request released after {:?}",
            start.elapsed()
        );
    }

    #[tokio::test]
    async fn test_targets_tracked_independently() {
        let limiter = RateLimiter::new();
        limiter.wait(1, 2.0).await;
        // A different target is not throttled by target 1's timestamp.
        let start = Instant::now();
        limiter.wait(2, 2.0).await;
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_explicit_delay_overload() {
        let limiter = RateLimiter::new();
        limiter.wait_delay(1, Duration::from_millis(40)).await;
        let start = Instant::now();
        limiter.wait_delay(1, Duration::from_millis(40)).await;
        assert!(start.elapsed() >= Duration::from_millis(35));
    }
}
