//! Small conversions shared by the interceptor service.

use http::HeaderMap;

pub(crate) fn header_map_to_vec(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| (name.as_str().to_string(), value.to_str().unwrap_or("").to_string()))
        .collect()
}

/// Best-effort `scheme://authority` reconstruction from a request URI, used
/// as the dispatch-time origin when the caller didn't set an `Origin`
/// header. Falls back to `http://<authority>` when no scheme is present
/// (e.g. origin-form request targets).
pub(crate) fn dispatch_origin_from_uri(uri: &http::Uri) -> String {
    let authority = uri.authority().map(|a| a.as_str().to_string()).unwrap_or_default();
    match uri.scheme_str() {
        Some(scheme) => format!("{scheme}://{authority}"),
        None => format!("http://{authority}"),
    }
}

pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
