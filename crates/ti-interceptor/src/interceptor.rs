//! InterceptorStateMachine (component G) — the synchronous half.
//!
//! `TrafficInterceptor` is the "opaque composer" of spec.md §6: it owns the
//! Bloom filter and the mirror client (both shared across every
//! transaction) and drives `onRequestStart`/`onResponseStart`. The
//! streaming half (`onResponseData`/`onResponseEnd`/`onResponseError`) lives
//! in [`crate::body::MirroredBody`], which a transaction's response body is
//! wrapped in once this module decides to mirror it.

use std::sync::Arc;

use http::Request;
use tracing::{debug, info};

use ti_common::Result;

use crate::body::MirrorState;
use crate::bloom::BloomFilter;
use crate::context::InterceptorContext;
use crate::filters::{admit_request, admit_response};
use crate::hash::identity_hash;
use crate::meta::mirror_body_headers;
use crate::mirror::MirrorClient;
use crate::options::TrafficInterceptorOptions;
use crate::url_utils::{extract_domain, extract_origin};
use crate::util::{dispatch_origin_from_uri, header_map_to_vec, now_ms};

/// WebSocket/HTTP upgrade status, used to detect `onRequestUpgrade`
/// transactions (spec.md 4.G transition 5: "No mirroring; transparently
/// forward").
const SWITCHING_PROTOCOLS: u16 = 101;

/// A constructed, validated interceptor instance. Cheap to clone (all
/// fields are `Arc`s); the clone shares the same Bloom filter and mirror
/// connection pool, matching spec.md §3's "Options and the Bloom filter
/// live with the interceptor instance."
#[derive(Clone)]
pub struct TrafficInterceptor {
    pub(crate) options: Arc<TrafficInterceptorOptions>,
    pub(crate) bloom: Arc<BloomFilter>,
    pub(crate) mirror: Arc<MirrorClient>,
}

impl TrafficInterceptor {
    /// Build an interceptor from validated options (component H already ran
    /// inside `TrafficInterceptorOptionsBuilder::build`).
    pub fn new(options: TrafficInterceptorOptions) -> Result<Self> {
        let bloom = BloomFilter::new(options.bloom_filter.size, options.bloom_filter.error_rate);
        let mirror = MirrorClient::new(options.traffic_inspector.clone())?;
        info!(
            inspector_url = %options.traffic_inspector.url,
            bloom_bits = bloom.num_bits(),
            bloom_hashes = bloom.num_hash_functions(),
            "traffic interceptor constructed"
        );
        Ok(Self {
            options: Arc::new(options),
            bloom: Arc::new(bloom),
            mirror: Arc::new(mirror),
        })
    }

    /// `onRequestStart`: populate request metadata, run `admit_request`,
    /// consult/update the Bloom filter, and decide the dedup outcome.
    /// Always returns a context; dropped requests carry
    /// `intercept_request == Some(false)` and both send flags `false`.
    pub(crate) fn on_request_start<ReqBody>(&self, req: &Request<ReqBody>) -> InterceptorContext {
        let mut ctx = InterceptorContext::new(self.options.clone());
        ctx.request.timestamp = now_ms();
        ctx.request.method = req.method().as_str().to_string();
        ctx.request.headers = header_map_to_vec(req.headers());

        let dispatch_origin = dispatch_origin_from_uri(req.uri());
        ctx.request.origin = extract_origin(&dispatch_origin, req.headers());
        if self.options.matching_domains.is_some() {
            ctx.request.domain = extract_domain(&ctx.request.origin);
        }

        let path = req.uri().path();
        let path = if path.is_empty() { "/" } else { path };
        ctx.request.url = format!("{}{}", ctx.request.origin, path);

        let admitted = admit_request(&ctx)
            && self
                .options
                .intercept_request
                .as_ref()
                .map_or(true, |predicate| predicate(&ctx));

        if !admitted {
            ctx.intercept_request = Some(false);
            ctx.send_body = Some(false);
            ctx.send_meta = Some(false);
            debug!(url = %ctx.request.url, reason = "skip by request", "request dropped");
            return ctx;
        }

        ctx.intercept_request = Some(true);
        let hash = identity_hash(&ctx.request.url);
        ctx.request.hash = Some(hash);

        if self.bloom.check_and_insert(hash) {
            ctx.send_meta = Some(true);
            ctx.send_body = Some(false);
            debug!(url = %ctx.request.url, reason = "skip by bloom filter", "body mirror skipped");
        } else {
            ctx.send_meta = Some(true);
            ctx.send_body = Some(true);
        }

        ctx
    }

    /// `onResponseStart`: record response metadata, run `admit_response`,
    /// and (if admitted) start the streaming body mirror. Returns `None`
    /// when the transaction should be a pure passthrough — either because
    /// the request was already dropped, this is a protocol upgrade, or the
    /// response itself fails admission.
    pub(crate) fn on_response_start(
        &self,
        mut ctx: InterceptorContext,
        status: http::StatusCode,
        headers: &http::HeaderMap,
    ) -> Option<MirrorState> {
        ctx.response.status_code = status.as_u16();
        ctx.response.headers = header_map_to_vec(headers);

        if ctx.request_dropped() {
            return None;
        }

        if ctx.response.status_code == SWITCHING_PROTOCOLS {
            debug!(url = %ctx.request.url, "protocol upgrade, passthrough only");
            return None;
        }

        let admitted = admit_response(&ctx)
            && self
                .options
                .intercept_response
                .as_ref()
                .map_or(true, |predicate| predicate(&ctx));

        if !admitted {
            ctx.intercept_response = Some(false);
            ctx.send_body = Some(false);
            ctx.send_meta = Some(false);
            debug!(url = %ctx.request.url, reason = "skip by response", "response dropped");
            return None;
        }

        ctx.intercept_response = Some(true);
        ctx.hasher.reset();

        let mut state = MirrorState::new(ctx, self.mirror.clone());
        if state.ctx.send_body == Some(true) {
            let headers = mirror_body_headers(&state.ctx);
            state.start_body_mirror(headers);
        }
        Some(state)
    }
}
