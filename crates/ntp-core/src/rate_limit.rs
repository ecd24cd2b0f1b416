//! Per-user token-bucket rate limiting.
//!
//! Acquisition is blocking-await: there is no reject path at this layer.
//! Buckets are created lazily per user id and live for the process lifetime.

use std::collections::HashMap;
use std::sync::Mutex;
use tokio::time::{Duration, Instant};

const RATE: f64 = 3.0;
const PERIOD: Duration = Duration::from_secs(1);
const BURST: f64 = 3.0;

struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new() -> Self {
        Self {
            tokens: BURST,
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * RATE / PERIOD.as_secs_f64()).min(BURST);
        self.last_refill = now;
    }

    /// Returns `Some(wait)` if a token isn't available yet, else takes one
    /// and returns `None`.
    fn try_take(&mut self) -> Option<Duration> {
        self.refill();
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            None
        } else {
            let deficit = 1.0 - self.tokens;
            Some(Duration::from_secs_f64(deficit * PERIOD.as_secs_f64() / RATE))
        }
    }
}

/// Per-user-id map of token buckets, 3 req/s with a burst of 3.
pub struct RateLimiter {
    buckets: Mutex<HashMap<String, TokenBucket>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Suspend until a token is available for `user`, then consume it.
    pub async fn acquire(&self, user: &str) {
        loop {
            let wait = {
                let mut buckets = self.buckets.lock().unwrap();
                let bucket = buckets
                    .entry(user.to_string())
                    .or_insert_with(TokenBucket::new);
                bucket.try_take()
            };
            match wait {
                None => return,
                Some(d) => tokio::time::sleep(d).await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn burst_of_three_is_immediate() {
        let limiter = RateLimiter::new();
        let start = Instant::now();
        limiter.acquire("u").await;
        limiter.acquire("u").await;
        limiter.acquire("u").await;
        assert!(start.elapsed() < Duration::from_millis(10));
    }

    #[tokio::test(start_paused = true)]
    async fn fourth_request_waits_for_refill() {
        let limiter = RateLimiter::new();
        for _ in 0..3 {
            limiter.acquire("u").await;
        }
        let start = Instant::now();
        limiter.acquire("u").await;
        assert!(start.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn buckets_are_independent_per_user() {
        let limiter = RateLimiter::new();
        for _ in 0..3 {
            limiter.acquire("a").await;
        }
        let start = Instant::now();
        limiter.acquire("b").await;
        assert!(start.elapsed() < Duration::from_millis(10));
    }
}
