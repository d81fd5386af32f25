//! `tower::Layer` wiring: `InterceptorLayer` turns any inner
//! `Service<Request<ReqBody>>` into one that mirrors a filtered,
//! deduplicated subset of its traffic.

use tower_layer::Layer;

use crate::interceptor::TrafficInterceptor;
use crate::service::InterceptorService;

#[derive(Clone)]
pub struct InterceptorLayer {
    interceptor: TrafficInterceptor,
}

impl InterceptorLayer {
    pub fn new(interceptor: TrafficInterceptor) -> Self {
        Self { interceptor }
    }
}

impl<S> Layer<S> for InterceptorLayer {
    type Service = InterceptorService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        InterceptorService::new(inner, self.interceptor.clone())
    }
}
