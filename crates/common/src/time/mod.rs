//! Time abstractions
//!
//! Components that wait or compare against "now" take a [`Clock`] so tests can
//! drive virtual time with [`MockClock`] instead of sleeping.

pub mod clock;

pub use clock::{Clock, MockClock, SharedClock, SystemClock};
