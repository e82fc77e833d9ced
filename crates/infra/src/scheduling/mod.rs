//! Background jobs
//!
//! Both schedulers follow the same lifecycle: explicit `start`/`stop`, a
//! tracked join handle, a cancellation token, and a `*_once` entry point
//! for manual runs and tests.

pub mod contact_sync_scheduler;
pub mod error;
pub mod state_sweeper;

pub use contact_sync_scheduler::{
    ContactSyncScheduler, ContactSyncSchedulerConfig, SyncRunSummary,
};
pub use error::{SchedulerError, SchedulerResult};
pub use state_sweeper::OAuthStateSweeper;
