//! # HubSync Domain
//!
//! Business domain types for the HubSpot integration layer.
//!
//! This crate contains:
//! - Token, OAuth state, contact cache and sync cursor records
//! - The error taxonomy and Result alias shared by every crate
//! - Configuration structures
//! - Domain constants
//!
//! ## Architecture
//! - No dependencies on other HubSync crates
//! - No I/O
//! - Pure data structures and small invariants

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
