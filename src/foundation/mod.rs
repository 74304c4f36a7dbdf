//! Shared primitives: frame/time types, the crate error type and small numeric helpers.

pub mod core;
pub mod error;
pub(crate) mod math;
