//! Interceptor configuration: [`TrafficInterceptorOptions`], its defaults,
//! and the validation rules enforced at construction (component H).

use std::collections::HashMap;
use std::sync::Arc;

use ti_common::{Result, TiError};

/// Session/auth cookie names skipped by default, lowercased.
///
/// See the glossary: these are never forwarded to the collector because
/// their presence marks a request or response as carrying a credential.
pub const DEFAULT_SKIPPING_COOKIE_SESSION_IDS: &[&str] = &[
    "jsessionid",
    "phpsessid",
    "asp.net_sessionid",
    "connect.sid",
    "sid",
    "ssid",
    "auth_token",
    "access_token",
    "csrf_token",
    "xsrf-token",
    "x-csrf-token",
    "session",
    "refreshtoken",
    "token",
    "sessionid",
    "csrftoken",
    "authtoken",
    "accesstoken",
];

/// Request headers whose presence drops the request.
pub const DEFAULT_SKIPPING_REQUEST_HEADERS: &[&str] = &[
    "cache-control",
    "pragma",
    "if-none-match",
    "if-modified-since",
    "authorization",
    "proxy-authorization",
];

/// Response headers whose presence drops the response (the broader variant,
/// per SPEC_FULL.md §9.4).
pub const DEFAULT_SKIPPING_RESPONSE_HEADERS: &[&str] = &[
    "etag",
    "last-modified",
    "expires",
    "cache-control",
    "authorization",
    "proxy-authenticate",
    "www-authenticate",
    "set-cookie",
];

/// Default max mirrored response size: 5 MiB.
pub const DEFAULT_MAX_RESPONSE_SIZE: usize = 5 * 1024 * 1024;

/// The two collector endpoints a `TrafficInterceptor` mirrors to.
#[derive(Debug, Clone)]
pub struct TrafficInspectorOptions {
    /// Base URL of the collector, e.g. `http://inspector.local:3042`.
    pub url: String,
    /// Path appended to `url` for the streaming body POST.
    pub path_send_body: String,
    /// Path appended to `url` for the buffered metadata POST.
    pub path_send_meta: String,
}

/// Bloom filter sizing knobs (see `bloom.rs` for the derivation).
#[derive(Debug, Clone, Copy)]
pub struct BloomFilterOptions {
    /// Expected number of distinct elements (n). Must be >= 1.
    pub size: usize,
    /// Target false positive rate (p). Must be in (0, 1).
    pub error_rate: f64,
}

/// A predicate over the interceptor context, used for `intercept_request`/
/// `intercept_response` overrides.
pub type ContextPredicate = Arc<dyn Fn(&crate::context::InterceptorContext) -> bool + Send + Sync>;

/// A predicate over a response status code.
pub type StatusPredicate = Arc<dyn Fn(u16) -> bool + Send + Sync>;

/// Immutable, per-interceptor-instance configuration. Constructed once via
/// [`TrafficInterceptorOptionsBuilder::build`], then shared (`Arc`) across
/// every transaction the interceptor handles.
#[derive(Clone)]
pub struct TrafficInterceptorOptions {
    pub labels: HashMap<String, String>,
    pub traffic_inspector: TrafficInspectorOptions,
    pub bloom_filter: BloomFilterOptions,
    pub max_response_size: usize,
    pub matching_domains: Option<Vec<String>>,
    pub skipping_request_headers: Vec<String>,
    pub skipping_response_headers: Vec<String>,
    pub intercept_response_status_codes: StatusPredicate,
    pub skipping_cookie_session_ids: Vec<String>,
    pub intercept_request: Option<ContextPredicate>,
    pub intercept_response: Option<ContextPredicate>,
}

impl std::fmt::Debug for TrafficInterceptorOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrafficInterceptorOptions")
            .field("labels", &self.labels)
            .field("traffic_inspector_url", &self.traffic_inspector.url)
            .field("bloom_filter", &self.bloom_filter)
            .field("max_response_size", &self.max_response_size)
            .field("matching_domains", &self.matching_domains)
            .field("skipping_request_headers", &self.skipping_request_headers)
            .field("skipping_response_headers", &self.skipping_response_headers)
            .field("skipping_cookie_session_ids", &self.skipping_cookie_session_ids)
            .finish_non_exhaustive()
    }
}

fn default_status_predicate() -> StatusPredicate {
    Arc::new(|code| (200..300).contains(&code))
}

/// Builder for [`TrafficInterceptorOptions`], mirroring the fluent builder
/// style used elsewhere in this workspace for config objects.
pub struct TrafficInterceptorOptionsBuilder {
    labels: HashMap<String, String>,
    traffic_inspector: Option<TrafficInspectorOptions>,
    bloom_filter: BloomFilterOptions,
    max_response_size: usize,
    matching_domains: Option<Vec<String>>,
    skipping_request_headers: Option<Vec<String>>,
    skipping_response_headers: Option<Vec<String>>,
    intercept_response_status_codes: Option<StatusPredicate>,
    skipping_cookie_session_ids: Option<Vec<String>>,
    intercept_request: Option<ContextPredicate>,
    intercept_response: Option<ContextPredicate>,
}

impl Default for TrafficInterceptorOptionsBuilder {
    fn default() -> Self {
        Self {
            labels: HashMap::new(),
            traffic_inspector: None,
            bloom_filter: BloomFilterOptions {
                size: 10_000,
                error_rate: 0.01,
            },
            max_response_size: DEFAULT_MAX_RESPONSE_SIZE,
            matching_domains: None,
            skipping_request_headers: None,
            skipping_response_headers: None,
            intercept_response_status_codes: None,
            skipping_cookie_session_ids: None,
            intercept_request: None,
            intercept_response: None,
        }
    }
}

impl TrafficInterceptorOptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn labels(mut self, labels: HashMap<String, String>) -> Self {
        self.labels = labels;
        self
    }

    pub fn traffic_inspector(mut self, url: &str, path_send_body: &str, path_send_meta: &str) -> Self {
        self.traffic_inspector = Some(TrafficInspectorOptions {
            url: url.to_string(),
            path_send_body: path_send_body.to_string(),
            path_send_meta: path_send_meta.to_string(),
        });
        self
    }

    pub fn bloom_filter(mut self, size: usize, error_rate: f64) -> Self {
        self.bloom_filter = BloomFilterOptions { size, error_rate };
        self
    }

    pub fn max_response_size(mut self, bytes: usize) -> Self {
        self.max_response_size = bytes;
        self
    }

    pub fn matching_domains(mut self, domains: Vec<String>) -> Self {
        self.matching_domains = Some(domains);
        self
    }

    pub fn skipping_request_headers(mut self, headers: Vec<String>) -> Self {
        self.skipping_request_headers = Some(headers);
        self
    }

    pub fn skipping_response_headers(mut self, headers: Vec<String>) -> Self {
        self.skipping_response_headers = Some(headers);
        self
    }

    pub fn intercept_response_status_codes(mut self, pred: StatusPredicate) -> Self {
        self.intercept_response_status_codes = Some(pred);
        self
    }

    pub fn skipping_cookie_session_ids(mut self, cookies: Vec<String>) -> Self {
        self.skipping_cookie_session_ids = Some(cookies);
        self
    }

    pub fn intercept_request(mut self, pred: ContextPredicate) -> Self {
        self.intercept_request = Some(pred);
        self
    }

    pub fn intercept_response(mut self, pred: ContextPredicate) -> Self {
        self.intercept_response = Some(pred);
        self
    }

    /// Validate and freeze the options (component H).
    ///
    /// Rejects (refuses to construct) on the conditions SPEC_FULL.md §4.H
    /// lists. Missing override lists fall back to the defaults above.
    pub fn build(self) -> Result<TrafficInterceptorOptions> {
        let traffic_inspector = self
            .traffic_inspector
            .ok_or_else(|| TiError::Config("trafficInspector is required".to_string()))?;

        if traffic_inspector.url.trim().is_empty() {
            return Err(TiError::Config("trafficInspector.url must not be empty".to_string()));
        }
        if self.bloom_filter.size == 0 {
            return Err(TiError::Config("bloomFilter.size must be >= 1".to_string()));
        }
        if !(self.bloom_filter.error_rate > 0.0 && self.bloom_filter.error_rate < 1.0) {
            return Err(TiError::Config(
                "bloomFilter.errorRate must be in (0, 1)".to_string(),
            ));
        }
        if self.max_response_size == 0 {
            return Err(TiError::Config("maxResponseSize must be > 0".to_string()));
        }
        if let Some(domains) = &self.matching_domains {
            if domains.is_empty() || domains.iter().any(|d| d.trim().is_empty()) {
                return Err(TiError::Config(
                    "matchingDomains, if provided, must be a non-empty array of non-empty strings"
                        .to_string(),
                ));
            }
        }

        Ok(TrafficInterceptorOptions {
            labels: self.labels,
            traffic_inspector,
            bloom_filter: self.bloom_filter,
            max_response_size: self.max_response_size,
            matching_domains: self.matching_domains,
            skipping_request_headers: self
                .skipping_request_headers
                .unwrap_or_else(|| to_owned_vec(DEFAULT_SKIPPING_REQUEST_HEADERS)),
            skipping_response_headers: self
                .skipping_response_headers
                .unwrap_or_else(|| to_owned_vec(DEFAULT_SKIPPING_RESPONSE_HEADERS)),
            intercept_response_status_codes: self
                .intercept_response_status_codes
                .unwrap_or_else(default_status_predicate),
            skipping_cookie_session_ids: self
                .skipping_cookie_session_ids
                .unwrap_or_else(|| to_owned_vec(DEFAULT_SKIPPING_COOKIE_SESSION_IDS)),
            intercept_request: self.intercept_request,
            intercept_response: self.intercept_response,
        })
    }
}

fn to_owned_vec(defaults: &[&str]) -> Vec<String> {
    defaults.iter().map(|s| s.to_string()).collect()
}
