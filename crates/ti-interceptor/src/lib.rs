//! A `tower` middleware that observes a client's outbound HTTP traffic,
//! filters it down to a relevant subset, deduplicates repeated requests
//! against a Bloom filter, and mirrors admitted bodies and metadata to a
//! remote Traffic Inspector collector — without altering or delaying the
//! response the caller actually receives.
//!
//! Wire [`InterceptorLayer`] around any `tower::Service<http::Request<_>>`
//! whose response body implements `http_body::Body<Data = bytes::Bytes>`:
//!
//! ```ignore
//! let options = TrafficInterceptorOptionsBuilder::new()
//!     .traffic_inspector("http://inspector.local:3042", "/send-body", "/send-meta")
//!     .build()?;
//! let interceptor = TrafficInterceptor::new(options)?;
//! let service = ServiceBuilder::new()
//!     .layer(InterceptorLayer::new(interceptor))
//!     .service(origin_dispatcher);
//! ```

mod bloom;
mod body;
mod context;
mod filters;
mod hash;
mod interceptor;
mod layer;
mod meta;
mod mirror;
mod options;
mod service;
mod url_utils;
mod util;

pub use body::MirroredBody;
pub use context::InterceptorContext;
pub use hash::StreamingHasher;
pub use interceptor::TrafficInterceptor;
pub use layer::InterceptorLayer;
pub use mirror::{CollectorResponse, MirrorClient, MirrorError};
pub use options::{
    BloomFilterOptions, ContextPredicate, StatusPredicate, TrafficInspectorOptions,
    TrafficInterceptorOptions, TrafficInterceptorOptionsBuilder, DEFAULT_MAX_RESPONSE_SIZE,
    DEFAULT_SKIPPING_COOKIE_SESSION_IDS, DEFAULT_SKIPPING_REQUEST_HEADERS,
    DEFAULT_SKIPPING_RESPONSE_HEADERS,
};
pub use service::InterceptorService;

pub use ti_common::{Result, TiError};
