//! `tower::Service` wrapper implementing the request/response half of
//! InterceptorStateMachine (component G). Every six-callback transition in
//! SPEC_FULL.md §4.G maps onto either this file (`onRequestStart`,
//! `onResponseStart`) or [`crate::body::MirroredBody`] (`onResponseData`,
//! `onResponseEnd`, `onResponseError`, and the upgrade passthrough).

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use http::{Request, Response};
use http_body::Body;
use tower_service::Service;

use crate::body::MirroredBody;
use crate::interceptor::TrafficInterceptor;

/// Wraps an inner `Service` so that a filtered, deduplicated subset of its
/// traffic is mirrored to a Traffic Inspector collector. The inner
/// service's request and response are otherwise untouched — this is a
/// transparent middleware (spec.md §1).
pub struct InterceptorService<S> {
    inner: S,
    interceptor: TrafficInterceptor,
}

impl<S> InterceptorService<S> {
    pub fn new(inner: S, interceptor: TrafficInterceptor) -> Self {
        Self { inner, interceptor }
    }
}

impl<S: Clone> Clone for InterceptorService<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            interceptor: self.interceptor.clone(),
        }
    }
}

impl<S, ReqBody, RespBody> Service<Request<ReqBody>> for InterceptorService<S>
where
    S: Service<Request<ReqBody>, Response = Response<RespBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    ReqBody: Send + 'static,
    RespBody: Body<Data = Bytes> + Send + Unpin + 'static,
{
    type Response = Response<MirroredBody<RespBody>>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        // onRequestStart runs synchronously, before the inner service is
        // ever polled, so filter/dedup decisions cannot race the dispatch.
        let ctx = self.interceptor.on_request_start(&req);
        let interceptor = self.interceptor.clone();

        // Standard tower pattern for a `&mut self` call that needs a
        // `'static` future: swap in a clone, drive the original.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let resp = inner.call(req).await?;
            let (parts, body) = resp.into_parts();
            let state = interceptor.on_response_start(ctx, parts.status, &parts.headers);
            let mirrored = MirroredBody::new(body, state);
            Ok(Response::from_parts(parts, mirrored))
        })
    }
}
