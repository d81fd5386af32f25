//! URLUtilities (component C)
//!
//! Pure helpers for extracting a transaction's origin and bare domain from
//! dispatch-time data and headers.

use http::HeaderMap;
use url::Url;

/// If `headers` carries an `Origin` header (case-insensitive, as `HeaderMap`
/// always is), return it; otherwise fall back to `dispatch_origin`.
pub fn extract_origin(dispatch_origin: &str, headers: &HeaderMap) -> String {
    headers
        .get("origin")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| dispatch_origin.to_string())
}

/// Extract a dot-prefixed, lowercase bare domain from `scheme://host[:port]`,
/// `host:port`, or `host`. Returns `None` for empty input.
///
/// A scheme-prefixed input is parsed with `url::Url` (so a userinfo
/// component or an IPv6 literal host is handled the way any other URL
/// consumer in this ecosystem would); the bare `host[:port]` forms `url`
/// has no parser for on their own are handled by stripping the port
/// manually.
///
/// ```text
/// extract_domain("http://sub.plt.local:3000") == Some(".sub.plt.local")
/// extract_domain("")                          == None
/// extract_domain("local:3000")                == Some(".local")
/// extract_domain("local")                     == Some(".local")
/// ```
pub fn extract_domain(origin_or_host: &str) -> Option<String> {
    if origin_or_host.is_empty() {
        return None;
    }

    if let Ok(parsed) = Url::parse(origin_or_host) {
        if let Some(host) = parsed.host_str() {
            if !host.is_empty() {
                return Some(format!(".{}", host.to_lowercase()));
            }
        }
    }

    let host = match origin_or_host.find(':') {
        Some(idx) => &origin_or_host[..idx],
        None => origin_or_host,
    };

    if host.is_empty() {
        return None;
    }

    Some(format!(".{}", host.to_lowercase()))
}
