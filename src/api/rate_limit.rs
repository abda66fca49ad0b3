//! Token-bucket rate limiting for API calls
//!
//! Tokens refill continuously at `capacity / period` and each request
//! consumes one. `acquire` never rejects, it only delays. Refill, wait,
//! and consumption all happen under one async mutex, held across the sleep:
//! concurrent callers therefore serialize through the bucket and can never
//! observe a token count that would let a burst exceed the configured rate.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Configuration for the token bucket
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Maximum calls admitted per period (also the burst capacity)
    pub capacity: u32,
    /// Window over which `capacity` calls are allowed
    pub period: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        // Discogs allows 60 authenticated requests per minute.
        Self {
            capacity: 60,
            period: Duration::from_secs(60),
        }
    }
}

impl RateLimitConfig {
    /// Create a rate limit config
    pub fn new(capacity: u32, period: Duration) -> Self {
        Self { capacity, period }
    }
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    refilled_at: Instant,
}

/// Token bucket rate limiter
///
/// Invariant: `0 <= tokens <= capacity` at every observation point.
#[derive(Debug)]
pub struct RateLimiter {
    capacity: f64,
    refill_rate: f64,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    /// Create a new rate limiter. A zero capacity or period is clamped to
    /// the minimum rather than rejected; the limiter itself has no error
    /// conditions.
    pub fn new(config: RateLimitConfig) -> Self {
        let capacity = f64::from(config.capacity.max(1));
        let period = config.period.as_secs_f64().max(f64::EPSILON);
        let refill_rate = capacity / period;

        debug!(
            capacity,
            period_secs = period,
            refill_rate,
            "rate limiter initialized"
        );

        Self {
            capacity,
            refill_rate,
            bucket: Mutex::new(Bucket {
                tokens: capacity,
                refilled_at: Instant::now(),
            }),
        }
    }

    /// Block until one unit of capacity is available, then consume it.
    ///
    /// Tokens are first topped up from elapsed wall-clock time (capped at
    /// capacity). If less than one full token remains, the exact time until
    /// one accrues is computed and slept, with the lock still held.
    pub async fn acquire(&self) {
        let mut bucket = self.bucket.lock().await;

        let now = Instant::now();
        let elapsed = now.duration_since(bucket.refilled_at).as_secs_f64();
        bucket.tokens = self
            .capacity
            .min(bucket.tokens + elapsed * self.refill_rate);
        bucket.refilled_at = now;

        if bucket.tokens < 1.0 {
            let wait = (1.0 - bucket.tokens) / self.refill_rate;
            debug!(
                wait_secs = wait,
                tokens = bucket.tokens,
                "rate limit reached, waiting"
            );
            tokio::time::sleep(Duration::from_secs_f64(wait)).await;
            bucket.tokens = 1.0;
            bucket.refilled_at = Instant::now();
        }

        bucket.tokens -= 1.0;
    }

    /// Snapshot of the current token count, including accrual since the last
    /// refill. Monitoring only; stale the moment it returns.
    pub async fn available_tokens(&self) -> f64 {
        let bucket = self.bucket.lock().await;
        let elapsed = bucket.refilled_at.elapsed().as_secs_f64();
        self.capacity
            .min(bucket.tokens + elapsed * self.refill_rate)
    }

    /// True when no full token is currently available.
    pub async fn is_exhausted(&self) -> bool {
        self.available_tokens().await < 1.0
    }

    /// Refill the bucket to capacity. Testing hook; also useful after a long
    /// idle period when the remote window has certainly reset.
    pub async fn reset(&self) {
        let mut bucket = self.bucket.lock().await;
        bucket.tokens = self.capacity;
        bucket.refilled_at = Instant::now();
        debug!("rate limiter reset to full capacity");
    }
}
