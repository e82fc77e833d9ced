//! Keyed token-bucket rate limiting
//!
//! Each key (typically a tenant id) owns an independent bucket holding up to
//! `max_burst` tokens. Once the window elapses the bucket is refilled to full
//! in one step. Callers that find the bucket short wait until the refill
//! instead of receiving an error.
//!
//! Buckets live in a [`DashMap`]; every read-modify-write happens while the
//! entry's shard lock is held, and the lock is released before waiting.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::{debug, warn};

use crate::time::{Clock, SystemClock};

/// Configuration for the keyed rate limiter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiterConfig {
    /// Tokens available at the start of each window
    pub max_burst: u64,
    /// Time between full refills
    pub window: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self { max_burst: 100, window: Duration::from_secs(1) }
    }
}

impl RateLimiterConfig {
    /// Create a new configuration builder
    pub fn builder() -> RateLimiterConfigBuilder {
        RateLimiterConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_burst == 0 {
            return Err("max_burst must be greater than 0".to_string());
        }
        if self.window.is_zero() {
            return Err("window must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// Builder for RateLimiterConfig
#[derive(Debug)]
pub struct RateLimiterConfigBuilder {
    config: RateLimiterConfig,
}

impl Default for RateLimiterConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiterConfigBuilder {
    /// Start from the default config
    pub fn new() -> Self {
        Self { config: RateLimiterConfig::default() }
    }

    /// Tokens available per window
    pub fn max_burst(mut self, max_burst: u64) -> Self {
        self.config.max_burst = max_burst;
        self
    }

    /// Length of one refill window
    pub fn window(mut self, window: Duration) -> Self {
        self.config.window = window;
        self
    }

    /// Window length in milliseconds
    pub fn window_millis(self, millis: u64) -> Self {
        self.window(Duration::from_millis(millis))
    }

    /// Validate and build the config
    pub fn build(self) -> Result<RateLimiterConfig, String> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[derive(Debug, Clone, Copy)]
struct RateBucket {
    tokens: u64,
    reset_at: Instant,
}

impl RateBucket {
    fn full(config: &RateLimiterConfig, now: Instant) -> Self {
        Self { tokens: config.max_burst, reset_at: now + config.window }
    }

    fn refill_if_due(&mut self, config: &RateLimiterConfig, now: Instant) {
        if now >= self.reset_at {
            self.tokens = config.max_burst;
            self.reset_at = now + config.window;
        }
    }
}

/// Keyed token-bucket rate limiter
///
/// Construct one per upstream budget and share it by reference or `Arc`.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
///
/// use hubsync_common::resilience::{RateLimiter, RateLimiterConfig};
///
/// # async fn example() -> Result<(), String> {
/// let config = RateLimiterConfig::builder().max_burst(10).window(Duration::from_secs(1)).build()?;
/// let limiter = RateLimiter::new(config);
///
/// limiter.take("portal-42", 1).await;
/// assert_eq!(limiter.available("portal-42"), 9);
/// # Ok(())
/// # }
/// ```
pub struct RateLimiter<C: Clock = SystemClock> {
    config: RateLimiterConfig,
    buckets: DashMap<String, RateBucket>,
    clock: Arc<C>,
}

impl<C: Clock> RateLimiter<C> {
    /// Create a rate limiter with a custom clock
    pub fn with_clock(config: RateLimiterConfig, clock: C) -> Self {
        Self { config, buckets: DashMap::new(), clock: Arc::new(clock) }
    }

    /// Active configuration
    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    fn clamp_cost(&self, key: &str, cost: u64) -> u64 {
        if cost > self.config.max_burst {
            warn!(
                key,
                cost,
                max_burst = self.config.max_burst,
                "rate limit cost exceeds bucket size; clamping"
            );
            self.config.max_burst
        } else {
            cost
        }
    }

    /// Deducts `cost` when possible, otherwise returns the refill instant.
    fn try_deduct(&self, key: &str, cost: u64) -> Result<u64, Instant> {
        let now = self.clock.now();
        let mut bucket = self
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| RateBucket::full(&self.config, now));
        bucket.refill_if_due(&self.config, now);

        if bucket.tokens >= cost {
            bucket.tokens -= cost;
            Ok(bucket.tokens)
        } else {
            Err(bucket.reset_at)
        }
    }

    /// Wait until `cost` tokens are available for `key`, then consume them.
    ///
    /// Never fails. Costs above `max_burst` are clamped so the call can
    /// always complete within one window.
    pub async fn take(&self, key: &str, cost: u64) {
        let cost = self.clamp_cost(key, cost);
        loop {
            match self.try_deduct(key, cost) {
                Ok(remaining) => {
                    debug!(key, cost, remaining, "rate limit tokens taken");
                    return;
                }
                Err(reset_at) => {
                    debug!(key, cost, "rate limit exhausted; waiting for refill");
                    self.clock.sleep_until(reset_at).await;
                }
            }
        }
    }

    /// Consume `cost` tokens for `key` if they are available right now.
    pub fn try_take(&self, key: &str, cost: u64) -> bool {
        let cost = self.clamp_cost(key, cost);
        self.try_deduct(key, cost).is_ok()
    }

    /// Tokens `key` could take immediately.
    pub fn available(&self, key: &str) -> u64 {
        let now = self.clock.now();
        self.buckets.get(key).map_or(self.config.max_burst, |bucket| {
            if now >= bucket.reset_at {
                self.config.max_burst
            } else {
                bucket.tokens
            }
        })
    }

    /// Drop the bucket for `key`; the next call starts full.
    pub fn reset(&self, key: &str) {
        self.buckets.remove(key);
    }
}

impl RateLimiter<SystemClock> {
    /// Create a rate limiter driven by the system clock
    pub fn new(config: RateLimiterConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}
