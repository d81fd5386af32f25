//! MirrorClient (component F)
//!
//! A connection-pooled HTTP client bound to the collector's base URL.
//! Requests are independent; the client never retries and never
//! coordinates across transactions beyond sharing its connection pool.

use bytes::Bytes;
use futures::Stream;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{debug, error};

use ti_common::TiError;

use crate::options::TrafficInspectorOptions;

/// Mirror-delivery failures (SPEC_FULL.md §7's "Mirror delivery" taxonomy),
/// kept local to this crate since they're specific to collector I/O. Never
/// surfaced to the host; either logged in place or folded into
/// `TiError::Mirror`/`TiError::Internal` at the crate boundary via the
/// `From` impl below.
#[derive(Debug, Error)]
pub enum MirrorError {
    /// The pooled `reqwest::Client` failed to build. Fatal at construction.
    #[error("failed to build mirror http client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    /// A body or meta POST to the collector could not be sent.
    #[error("POST {url} failed: {source}")]
    Delivery { url: String, #[source] source: reqwest::Error },
}

impl From<MirrorError> for TiError {
    fn from(err: MirrorError) -> Self {
        match err {
            MirrorError::ClientBuild(e) => {
                TiError::Internal(format!("failed to build mirror http client: {e}"))
            }
            MirrorError::Delivery { url, source } => {
                TiError::Mirror(format!("POST {url} failed: {source}"))
            }
        }
    }
}

type MirrorResult<T> = std::result::Result<T, MirrorError>;

/// Outcome of a single mirror POST, used only to drive the §7 log line.
#[derive(Debug)]
pub struct CollectorResponse {
    pub status: StatusCode,
}

impl CollectorResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Pooled client talking to one Traffic Inspector collector.
#[derive(Clone)]
pub struct MirrorClient {
    http: Client,
    inspector: TrafficInspectorOptions,
}

impl MirrorClient {
    pub fn new(inspector: TrafficInspectorOptions) -> MirrorResult<Self> {
        let http = Client::builder()
            .user_agent(format!("traffic-interceptor/{}", ti_common::VERSION))
            .build()
            .map_err(MirrorError::ClientBuild)?;
        Ok(Self { http, inspector })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.inspector.url, path)
    }

    /// Streaming POST of the intercepted response body. `headers` carries
    /// the `content-type`/`content-length`/`x-labels`/`x-request-data`/
    /// `x-response-data` headers the state machine computes (§4.G).
    pub async fn post_body<S>(&self, headers: Vec<(String, String)>, body_stream: S) -> MirrorResult<CollectorResponse>
    where
        S: Stream<Item = std::result::Result<Bytes, std::io::Error>> + Send + Sync + 'static,
    {
        let url = self.endpoint(&self.inspector.path_send_body);
        let mut request = self.http.post(&url).body(reqwest::Body::wrap_stream(body_stream));
        for (name, value) in headers {
            request = request.header(name, value);
        }

        let response = request.send().await.map_err(|e| {
            error!(url = %url, error = %e, "mirror body POST failed");
            MirrorError::Delivery { url: url.clone(), source: e }
        })?;

        let status = response.status();
        if !status.is_success() {
            error!(url = %url, status = %status, "mirror body POST returned non-2xx");
        } else {
            debug!(url = %url, status = %status, "mirror body POST delivered");
        }
        Ok(CollectorResponse { status })
    }

    /// Buffered POST of a small JSON payload (the meta endpoint).
    pub async fn post_meta(&self, headers: Vec<(String, String)>, json_body: Vec<u8>) -> MirrorResult<CollectorResponse> {
        let url = self.endpoint(&self.inspector.path_send_meta);
        let mut request = self.http.post(&url).body(json_body);
        for (name, value) in headers {
            request = request.header(name, value);
        }

        let response = request.send().await.map_err(|e| {
            error!(url = %url, error = %e, "mirror meta POST failed");
            MirrorError::Delivery { url: url.clone(), source: e }
        })?;

        let status = response.status();
        if !status.is_success() {
            error!(url = %url, status = %status, "mirror meta POST returned non-2xx");
        } else {
            debug!(url = %url, status = %status, "mirror meta POST delivered");
        }
        Ok(CollectorResponse { status })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::TrafficInspectorOptions;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn inspector(base: &str) -> TrafficInspectorOptions {
        TrafficInspectorOptions {
            url: base.to_string(),
            path_send_body: "/send-body".to_string(),
            path_send_meta: "/send-meta".to_string(),
        }
    }

    #[tokio::test]
    async fn test_post_meta_delivers_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send-meta"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = MirrorClient::new(inspector(&server.uri())).unwrap();
        let body = serde_json::to_vec(&json!({ "ok": true })).unwrap();
        let result = client
            .post_meta(vec![("content-type".to_string(), "application/json".to_string())], body)
            .await
            .unwrap();
        assert!(result.is_success());
    }

    #[tokio::test]
    async fn test_post_meta_reports_non_2xx() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send-meta"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = MirrorClient::new(inspector(&server.uri())).unwrap();
        let result = client.post_meta(vec![], b"{}".to_vec()).await.unwrap();
        assert!(!result.is_success());
    }

    #[tokio::test]
    async fn test_post_body_streams_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send-body"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = MirrorClient::new(inspector(&server.uri())).unwrap();
        let stream = futures::stream::iter(vec![Ok::<_, std::io::Error>(Bytes::from_static(b"[/dummy response]"))]);
        let result = client.post_body(vec![], stream).await.unwrap();
        assert!(result.is_success());
    }
}
