//! Infrastructure error conversions

pub mod conversions;

pub use conversions::{from_status, into_domain, InfraError};
