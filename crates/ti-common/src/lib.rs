//! # ti-common
//!
//! Shared error type for the traffic interceptor workspace. Kept as its own
//! crate so the collector-facing mirror client and the interceptor core can
//! both depend on a single `Result`/`TiError` without a cyclic dependency.

pub mod error;

pub use error::{Result, TiError};

/// Crate version, re-exported for inclusion in the interceptor's `User-Agent`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
