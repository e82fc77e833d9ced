//! Per-portal OAuth credential lifecycle

pub mod ports;
pub mod service;

pub use service::TokenStore;
