//! Security primitives

pub mod signature;

pub use signature::{
    compute_v1_signature, compute_v3_signature, constant_time_eq, verify_v1_signature,
    verify_v3_signature,
};
