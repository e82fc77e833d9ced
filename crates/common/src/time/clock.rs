//! Clock trait with real and mock implementations

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::Notify;

/// Source of monotonic and wall-clock time, plus the ability to wait.
#[async_trait]
pub trait Clock: Send + Sync + 'static {
    /// Current instant (monotonic time)
    fn now(&self) -> Instant;

    /// Current wall-clock time in UTC
    fn utc_now(&self) -> DateTime<Utc>;

    /// Suspend until `deadline` has passed.
    async fn sleep_until(&self, deadline: Instant);
}

/// Real system clock backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn utc_now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep_until(&self, deadline: Instant) {
        tokio::time::sleep_until(deadline.into()).await;
    }
}

/// Type-erased clock shared between services.
pub type SharedClock = Arc<dyn Clock>;

#[async_trait]
impl<T: Clock + ?Sized> Clock for Arc<T> {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn utc_now(&self) -> DateTime<Utc> {
        (**self).utc_now()
    }

    async fn sleep_until(&self, deadline: Instant) {
        (**self).sleep_until(deadline).await;
    }
}

/// Mock clock for deterministic testing
///
/// Time only moves when a test calls [`MockClock::advance`] or, for a clock
/// built with [`MockClock::new`], when a waiter calls `sleep_until`, which
/// jumps virtual time forward to the deadline. Waiters on a
/// [`MockClock::manual`] clock instead park until a test advances past their
/// deadline. Virtual time never moves backwards. Clones share the same
/// timeline.
#[derive(Debug, Clone)]
pub struct MockClock {
    start: Instant,
    start_utc: DateTime<Utc>,
    elapsed: Arc<Mutex<Duration>>,
    advanced: Arc<Notify>,
    manual: bool,
}

impl MockClock {
    /// Create a new mock clock starting at the current instant
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    /// Create a mock clock whose wall clock reads `start_utc` at elapsed zero
    pub fn starting_at(start_utc: DateTime<Utc>) -> Self {
        Self {
            start: Instant::now(),
            start_utc,
            elapsed: Arc::new(Mutex::new(Duration::ZERO)),
            advanced: Arc::new(Notify::new()),
            manual: false,
        }
    }

    /// Create a mock clock that only moves on [`MockClock::advance`]
    pub fn manual() -> Self {
        Self { manual: true, ..Self::new() }
    }

    /// Advance the mock clock by a duration
    pub fn advance(&self, duration: Duration) {
        *self.elapsed.lock() += duration;
        self.advanced.notify_waiters();
    }

    /// Advance the mock clock by milliseconds (convenience method)
    pub fn advance_millis(&self, millis: u64) {
        self.advance(Duration::from_millis(millis));
    }

    /// Total virtual time elapsed since creation
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock()
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.start + self.elapsed()
    }

    fn utc_now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.elapsed()).unwrap_or_default();
        self.start_utc + elapsed
    }

    async fn sleep_until(&self, deadline: Instant) {
        let target = deadline.saturating_duration_since(self.start);
        if self.manual {
            loop {
                // Registered before the check so an advance in between is not lost.
                let advanced = self.advanced.notified();
                if self.elapsed() >= target {
                    return;
                }
                advanced.await;
            }
        }
        {
            let mut elapsed = self.elapsed.lock();
            if target > *elapsed {
                *elapsed = target;
            }
        }
        // Let other tasks observe the new time before the caller re-checks.
        tokio::task::yield_now().await;
    }
}
