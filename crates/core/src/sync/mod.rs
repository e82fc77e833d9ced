//! Incremental contact sync

pub mod ports;
pub mod service;

pub use service::ContactSyncPoller;
