//! Hybrid local-cache / remote contact search

mod merge;
pub mod ports;
pub mod service;

pub use merge::merge_contacts;
pub use service::{ContactSearchService, SearchOutcome};
