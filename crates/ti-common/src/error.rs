//! Error types shared across the traffic interceptor workspace
//!
//! Provides a unified error type for interceptor construction and for
//! mirror-delivery failures that bubble up as far as a log line.

use thiserror::Error;

/// Result type alias using [`TiError`]
pub type Result<T> = std::result::Result<T, TiError>;

/// Unified error type for traffic interceptor operations
#[derive(Debug, Error)]
pub enum TiError {
    /// Rejected at construction time: an option value is out of range or
    /// missing. Fatal — the interceptor is never built.
    #[error("configuration error: {0}")]
    Config(String),

    /// A mirror POST (body or meta) to the collector could not be
    /// delivered, or the collector returned a non-2xx. Non-fatal: the host
    /// transaction is never affected by this.
    #[error("mirror delivery error: {0}")]
    Mirror(String),

    /// Generic internal error for conditions that should not occur.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for TiError {
    fn from(err: serde_json::Error) -> Self {
        TiError::Internal(format!("serialization failed: {err}"))
    }
}

impl From<anyhow::Error> for TiError {
    fn from(err: anyhow::Error) -> Self {
        TiError::Internal(err.to_string())
    }
}
