//! The streaming half of InterceptorStateMachine (component G): a
//! `http_body::Body` wrapper that tees response frames into the mirror
//! body POST and the streaming hasher, while always forwarding the
//! original frame to the host untouched.
//!
//! `poll_frame` realizes `onResponseData`; the `Ready(None)` branch
//! realizes `onResponseEnd`; the `Ready(Some(Err(_)))` branch and `Drop`
//! realize `onResponseError`/abort.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body::{Body, Frame, SizeHint};
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::context::InterceptorContext;
use crate::mirror::MirrorClient;

/// Bound on the in-flight mirror write queue. A full queue means the
/// collector connection is slower than the origin is producing bytes;
/// rather than suspend the host's poll (which would delay host delivery,
/// something SPEC_FULL.md explicitly forbids for a pull-based body), a
/// full queue causes that chunk to be dropped from the *mirror* only — the
/// host always receives every byte. This is the pull-model resolution of
/// spec.md §5's "await drain" suspension point; see DESIGN.md.
const MIRROR_QUEUE_DEPTH: usize = 64;

pub(crate) type MirrorChunk = std::result::Result<Bytes, std::io::Error>;

/// Live mirroring state for one transaction's response body. Present only
/// when `send_meta` or `send_body` ended up `true`; a `None` state makes
/// [`MirroredBody`] a pure passthrough.
pub(crate) struct MirrorState {
    pub ctx: InterceptorContext,
    pub mirror: Arc<MirrorClient>,
    pub body_tx: Option<mpsc::Sender<MirrorChunk>>,
    pub body_task: Option<tokio::task::JoinHandle<()>>,
    pub dropped_chunks: u64,
}

impl MirrorState {
    pub fn new(ctx: InterceptorContext, mirror: Arc<MirrorClient>) -> Self {
        Self {
            ctx,
            mirror,
            body_tx: None,
            body_task: None,
            dropped_chunks: 0,
        }
    }

    /// Start the streaming body POST (onResponseStart, when `send_body`).
    /// Returns the sender half; the receiver is handed to `MirrorClient`.
    pub fn start_body_mirror(&mut self, headers: Vec<(String, String)>) {
        let (tx, rx) = mpsc::channel::<MirrorChunk>(MIRROR_QUEUE_DEPTH);
        let stream = tokio_stream::wrappers::ReceiverStream::new(rx);
        let mirror = self.mirror.clone();
        let url_for_log = self.ctx.request.url.clone();
        let handle = tokio::spawn(async move {
            match mirror.post_body(headers, stream).await {
                Ok(resp) if !resp.is_success() => {
                    error!(url = %url_for_log, status = %resp.status, "mirror body POST rejected by collector");
                }
                Ok(_) => {}
                Err(e) => {
                    error!(url = %url_for_log, error = %e, "mirror body POST failed");
                }
            }
        });
        self.body_tx = Some(tx);
        self.body_task = Some(handle);
    }

    fn tee_chunk(&mut self, data: &Bytes) {
        if self.ctx.send_meta == Some(true) {
            self.ctx.hasher.update(data);
        }
        if self.ctx.send_body == Some(true) {
            if let Some(tx) = &self.body_tx {
                if tx.try_send(Ok(data.clone())).is_err() {
                    self.dropped_chunks += 1;
                }
            }
        }
    }

    /// onResponseEnd: close the writer (drop closes the channel, ending the
    /// upstream POST's body stream), await that POST, then fire the meta
    /// POST. Run as a detached task so it never delays the host, which
    /// already received `Ready(None)` by the time this runs.
    fn finish(mut self) {
        tokio::spawn(async move {
            let body_tx = self.body_tx.take();
            drop(body_tx); // signal end-of-stream to the body POST task

            if let Some(handle) = self.body_task.take() {
                if let Err(e) = handle.await {
                    error!(error = %e, "mirror body POST task panicked");
                }
            }
            if self.dropped_chunks > 0 {
                debug!(
                    url = %self.ctx.request.url,
                    dropped_chunks = self.dropped_chunks,
                    "mirror queue saturated; some body bytes were not mirrored (host unaffected)"
                );
            }

            if self.ctx.send_meta == Some(true) {
                self.ctx.response.hash = Some(self.ctx.hasher.digest());
                if let Err(e) = crate::meta::send_meta(&self.mirror, &self.ctx).await {
                    error!(url = %self.ctx.request.url, error = %e, "mirror meta POST failed");
                }
            }
        });
    }

    /// onResponseError/abort: cancel the in-flight body POST, never fire
    /// meta, log at error level.
    fn teardown(mut self, reason: &str) {
        if let Some(handle) = self.body_task.take() {
            handle.abort();
        }
        error!(url = %self.ctx.request.url, reason = %reason, "response stream torn down");
    }
}

/// Response body wrapper installed on every transaction, mirroring or not.
pub struct MirroredBody<B> {
    inner: B,
    state: Option<MirrorState>,
}

impl<B> MirroredBody<B> {
    pub(crate) fn new(inner: B, state: Option<MirrorState>) -> Self {
        Self { inner, state }
    }
}

impl<B> Body for MirroredBody<B>
where
    B: Body<Data = Bytes> + Unpin,
{
    type Data = Bytes;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<std::result::Result<Frame<Bytes>, Self::Error>>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_frame(cx) {
            Poll::Ready(Some(Ok(frame))) => {
                if let Some(data) = frame.data_ref() {
                    if let Some(state) = this.state.as_mut() {
                        state.tee_chunk(data);
                    }
                }
                Poll::Ready(Some(Ok(frame)))
            }
            Poll::Ready(Some(Err(err))) => {
                if let Some(state) = this.state.take() {
                    state.teardown("onResponseError");
                }
                Poll::Ready(Some(Err(err)))
            }
            Poll::Ready(None) => {
                if let Some(state) = this.state.take() {
                    state.finish();
                }
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn is_end_stream(&self) -> bool {
        self.state.is_none() && self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl<B> Drop for MirroredBody<B> {
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            state.teardown("dropped before completion (host abort)");
        }
    }
}
