//! # HubSync Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - HubSpot OAuth and CRM HTTP clients
//! - In-memory and Postgres repository implementations
//! - Configuration loading
//! - Background schedulers (state sweep, contact sync)
//!
//! ## Architecture
//! - Implements traits defined in `hubsync-core`
//! - Contains all "impure" code (network, database, timers)

pub mod config;
pub mod errors;
pub mod http;
pub mod hubspot;
pub mod scheduling;
pub mod store;

// Re-export commonly used items
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder};
pub use hubspot::{HubSpotContactsClient, HubSpotOAuthClient};
pub use scheduling::{
    ContactSyncScheduler, ContactSyncSchedulerConfig, OAuthStateSweeper, SchedulerError,
};
pub use store::{MemoryStore, PostgresStore};
