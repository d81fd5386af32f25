//! FilterPredicates (component B)
//!
//! Pure functions deciding whether a transaction's request and response are
//! worth reporting. No I/O; predicates short-circuit on the first
//! disqualifier, but header/cookie iteration order never affects the
//! outcome.

use crate::context::InterceptorContext;

/// `true` iff `domain` is `Some` and ends with at least one of `suffixes`.
/// `suffixes` empty/`None` always matches (all domains admitted).
pub fn matches_domain(domain: Option<&str>, suffixes: Option<&[String]>) -> bool {
    let suffixes = match suffixes {
        None => return true,
        Some(s) if s.is_empty() => return true,
        Some(s) => s,
    };
    match domain {
        None => false,
        Some(d) => suffixes.iter().any(|suffix| d.ends_with(suffix.as_str())),
    }
}

fn header_names_lower<'a>(headers: &'a [(String, String)]) -> impl Iterator<Item = String> + 'a {
    headers.iter().map(|(name, _)| name.to_lowercase())
}

fn find_header_value<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Parse a `Cookie:` or `Set-Cookie:`-shaped value into `(name, value)`
/// pairs, splitting on `;` then the *first* `=` (cookie values may
/// themselves contain `=`, e.g. base64 padding).
fn parse_cookie_names(raw: &str) -> impl Iterator<Item = String> + '_ {
    raw.split(';').filter_map(|pair| {
        let pair = pair.trim();
        if pair.is_empty() {
            return None;
        }
        let name = match pair.find('=') {
            Some(idx) => &pair[..idx],
            None => pair,
        };
        Some(name.trim().to_lowercase())
    })
}

/// Rule 1: method is `GET` (case-sensitive).
/// Rule 2: domain matching, via [`matches_domain`].
/// Rule 3: no header key (any case) is in `skipping_request_headers`.
/// Rule 4: if a `Cookie` header is present, no parsed cookie name is a
/// session id.
pub fn admit_request(ctx: &InterceptorContext) -> bool {
    if ctx.request.method != "GET" {
        return false;
    }

    if !matches_domain(ctx.request.domain.as_deref(), ctx.options.matching_domains.as_deref()) {
        return false;
    }

    let skip_headers = &ctx.options.skipping_request_headers;
    if header_names_lower(&ctx.request.headers).any(|name| skip_headers.iter().any(|s| s == &name)) {
        return false;
    }

    if let Some(cookie_value) = find_header_value(&ctx.request.headers, "cookie") {
        let skip_cookies = &ctx.options.skipping_cookie_session_ids;
        if parse_cookie_names(cookie_value).any(|name| skip_cookies.iter().any(|s| s == &name)) {
            return false;
        }
    }

    true
}

/// Rule 1: `intercept_response_status_codes(status)`.
/// Rule 2: no response header key is in `skipping_response_headers`.
/// Rule 3: if `Set-Cookie` is present, no parsed cookie name is a session id.
/// Rule 4: if `Content-Length` is present and exceeds `max_response_size`,
/// fail; if absent, the response is admitted (documented caveat: filtering
/// is best-effort at stream start).
pub fn admit_response(ctx: &InterceptorContext) -> bool {
    if !(ctx.options.intercept_response_status_codes)(ctx.response.status_code) {
        return false;
    }

    let skip_headers = &ctx.options.skipping_response_headers;
    if header_names_lower(&ctx.response.headers).any(|name| skip_headers.iter().any(|s| s == &name)) {
        return false;
    }

    if let Some(set_cookie) = find_header_value(&ctx.response.headers, "set-cookie") {
        let skip_cookies = &ctx.options.skipping_cookie_session_ids;
        if parse_cookie_names(set_cookie).any(|name| skip_cookies.iter().any(|s| s == &name)) {
            return false;
        }
    }

    if let Some(content_length) = find_header_value(&ctx.response.headers, "content-length") {
        if let Ok(len) = content_length.parse::<usize>() {
            if len > ctx.options.max_response_size {
                return false;
            }
        }
    }

    true
}
