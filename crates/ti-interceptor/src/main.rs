//! Demo binary: wires `InterceptorLayer` around a toy origin service and
//! sends it a couple of requests, so the mirrored traffic can be watched
//! against a local collector (e.g. a `wiremock` stub or a real Traffic
//! Inspector instance) while developing.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use http::{Request, Response};
use http_body_util::{BodyExt, Full};
use tower::{Service, ServiceBuilder, ServiceExt};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ti_interceptor::{InterceptorLayer, TrafficInterceptor, TrafficInterceptorOptionsBuilder};

#[derive(Clone)]
struct OriginDispatcher;

impl Service<Request<Full<Bytes>>> for OriginDispatcher {
    type Response = Response<Full<Bytes>>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Full<Bytes>>) -> Self::Future {
        let path = req.uri().path().to_string();
        Box::pin(async move {
            Ok(Response::builder()
                .status(200)
                .header("content-type", "application/json")
                .body(Full::new(Bytes::from(format!("{{\"path\":\"{path}\"}}"))))
                .unwrap())
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let inspector_url =
        std::env::var("TRAFFIC_INSPECTOR_URL").unwrap_or_else(|_| "http://127.0.0.1:3042".to_string());

    let options = TrafficInterceptorOptionsBuilder::new()
        .traffic_inspector(&inspector_url, "/send-body", "/send-meta")
        .build()?;
    let interceptor = TrafficInterceptor::new(options)?;

    let mut service = ServiceBuilder::new()
        .layer(InterceptorLayer::new(interceptor))
        .service(OriginDispatcher);

    for path in ["/users/1", "/users/1", "/health"] {
        let req = Request::builder()
            .method("GET")
            .uri(format!("http://app.example{path}"))
            .body(Full::new(Bytes::new()))?;
        let resp = service.ready().await?.call(req).await.unwrap();
        let body = resp.into_body().collect().await?.to_bytes();
        tracing::info!(path, body = %String::from_utf8_lossy(&body), "dispatched");
    }

    Ok(())
}
