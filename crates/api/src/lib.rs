//! # HubSync API
//!
//! HTTP surface and process entry point.
//!
//! This crate contains:
//! - Application context (dependency injection)
//! - Axum routes for the OAuth handshake, contact search, sync and webhooks
//! - Background job wiring and logging setup
//!
//! ## Architecture
//! - Depends on `common`, `domain`, `core` and `infra`
//! - Wires up the hexagonal architecture

pub mod context;
pub mod error;
pub mod routes;
pub mod utils;

pub use context::{AppContext, BackgroundJobs};
pub use error::ApiError;
pub use routes::build_router;
