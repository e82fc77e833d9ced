//! OAuth authorization-code handshake

pub mod ports;
pub mod service;

pub use service::OAuthFlowManager;
