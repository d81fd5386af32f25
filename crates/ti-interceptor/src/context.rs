//! InterceptorContext (component D)
//!
//! Per-transaction state, created at `onRequestStart` and released when the
//! last lifecycle event for that transaction returns. Owned exclusively by
//! the task driving that transaction; never shared behind a lock.

use std::collections::HashMap;
use std::sync::Arc;

use crate::hash::StreamingHasher;
use crate::options::TrafficInterceptorOptions;

/// Request-side fields captured at `onRequestStart`.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub method: String,
    pub headers: Vec<(String, String)>,
    /// Epoch milliseconds at context creation.
    pub timestamp: i64,
    /// `origin + path`, no query string.
    pub url: String,
    pub origin: String,
    pub domain: Option<String>,
    /// Identity hash of `url`, the Bloom key. Populated once the request is
    /// admitted.
    pub hash: Option<u64>,
}

/// Response-side fields captured at `onResponseStart`/`onResponseEnd`.
#[derive(Debug, Clone, Default)]
pub struct ResponseMeta {
    pub status_code: u16,
    pub headers: Vec<(String, String)>,
    /// Finalized body hash, populated at `onResponseEnd`.
    pub hash: Option<u64>,
    pub content_length: Option<u64>,
}

/// Per-transaction state bag carried across the six lifecycle callbacks.
pub struct InterceptorContext {
    pub options: Arc<TrafficInterceptorOptions>,
    pub hasher: StreamingHasher,
    pub request: RequestMeta,
    pub response: ResponseMeta,
    pub labels: HashMap<String, String>,
    /// `None` until `admit_request` has run.
    pub intercept_request: Option<bool>,
    /// `None` until `admit_response` has run.
    pub intercept_response: Option<bool>,
    /// Whether a meta POST should be attempted. Implies nothing about
    /// `send_body` on its own; see `send_body` doc.
    pub send_meta: Option<bool>,
    /// Whether a body POST should be attempted. `send_body == Some(true)`
    /// implies `send_meta == Some(true)` (invariant from SPEC_FULL.md §3).
    pub send_body: Option<bool>,
}

impl InterceptorContext {
    pub fn new(options: Arc<TrafficInterceptorOptions>) -> Self {
        let labels = options.labels.clone();
        Self {
            options,
            hasher: StreamingHasher::new(),
            request: RequestMeta::default(),
            response: ResponseMeta::default(),
            labels,
            intercept_request: None,
            intercept_response: None,
            send_meta: None,
            send_body: None,
        }
    }

    /// `true` once request admission has run and failed. Used to
    /// short-circuit every later lifecycle callback straight to
    /// pass-through, per the DROPPED state.
    pub fn request_dropped(&self) -> bool {
        self.intercept_request == Some(false)
    }

    /// `true` once response admission has run and failed (RESP_ADMITTED ->
    /// no -> DROPPED).
    pub fn response_dropped(&self) -> bool {
        self.intercept_response == Some(false)
    }
}
