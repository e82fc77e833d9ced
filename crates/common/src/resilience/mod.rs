//! Resilience patterns for protecting downstream services
//!
//! - **Rate Limiter**: keyed token buckets that make callers wait for capacity
//!   instead of failing

pub mod rate_limiter;

pub use rate_limiter::{RateLimiter, RateLimiterConfig, RateLimiterConfigBuilder};
