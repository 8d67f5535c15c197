//! Streamed response relay.
//!
//! Forwards UI stream events to the HTTP body as SSE frames without
//! buffering. The relay owns the turn's deadline: when `max_duration`
//! expires it closes any open text, reasoning or step block, writes a
//! terminal error and closes the stream. When the client
//! goes away the body receiver is dropped and `cancel` fires, which stops the
//! turn and its model task.

use std::convert::Infallible;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::Response;
use futures_util::stream::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::llm::FinishReason;

use super::stream::{DONE_FRAME, STREAM_HEADER, STREAM_VERSION, UiStreamEvent};

const FRAME_BUFFER: usize = 32;

/// Build the streaming response for one turn.
pub fn sse_response<S>(events: S, max_duration: Duration, cancel: CancellationToken) -> Response
where
    S: Stream<Item = UiStreamEvent> + Send + Unpin + 'static,
{
    let (tx, rx) = mpsc::channel::<Result<Bytes, Infallible>>(FRAME_BUFFER);
    tokio::spawn(forward(events, tx, max_duration, cancel));

    let mut response = Response::new(Body::from_stream(ReceiverStream::new(rx)));
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(STREAM_HEADER, HeaderValue::from_static(STREAM_VERSION));
    headers.insert("x-accel-buffering", HeaderValue::from_static("no"));
    response
}

async fn forward<S>(
    mut events: S,
    tx: mpsc::Sender<Result<Bytes, Infallible>>,
    max_duration: Duration,
    cancel: CancellationToken,
) where
    S: Stream<Item = UiStreamEvent> + Unpin,
{
    let deadline = tokio::time::sleep(max_duration);
    tokio::pin!(deadline);
    let mut open = OpenBlocks::default();

    loop {
        tokio::select! {
            biased;
            _ = tx.closed() => {
                debug!("client disconnected, cancelling turn");
                cancel.cancel();
                return;
            }
            _ = &mut deadline => {
                warn!(seconds = max_duration.as_secs(), "response exceeded maximum duration");
                cancel.cancel();
                let message = format!("response exceeded {}s", max_duration.as_secs());
                for event in open.abort(message) {
                    if !send_event(&tx, &event).await {
                        return;
                    }
                }
                break;
            }
            event = events.next() => {
                let Some(event) = event else { break };
                open.observe(&event);
                if !send_event(&tx, &event).await {
                    cancel.cancel();
                    return;
                }
            }
        }
    }

    let _ = tx.send(Ok(Bytes::from_static(DONE_FRAME.as_bytes()))).await;
}

/// Framing state of the events forwarded so far.
#[derive(Debug, Default)]
struct OpenBlocks {
    started: bool,
    finished: bool,
    in_step: bool,
    text: Vec<String>,
    reasoning: Vec<String>,
}

impl OpenBlocks {
    fn observe(&mut self, event: &UiStreamEvent) {
        match event {
            UiStreamEvent::Start { .. } => self.started = true,
            UiStreamEvent::StartStep => self.in_step = true,
            UiStreamEvent::FinishStep => self.in_step = false,
            UiStreamEvent::TextStart { id } => self.text.push(id.clone()),
            UiStreamEvent::TextEnd { id } => self.text.retain(|open| open != id),
            UiStreamEvent::ReasoningStart { id } => self.reasoning.push(id.clone()),
            UiStreamEvent::ReasoningEnd { id } => self.reasoning.retain(|open| open != id),
            UiStreamEvent::Finish { .. } => self.finished = true,
            _ => {}
        }
    }

    /// Events that end the stream cleanly with `message` as its error.
    /// Empty once the turn has already finished.
    fn abort(&mut self, message: String) -> Vec<UiStreamEvent> {
        if self.finished {
            return Vec::new();
        }
        let mut out = Vec::new();
        if !self.started {
            out.push(UiStreamEvent::Start { message_id: None });
        }
        out.extend(self.reasoning.drain(..).map(|id| UiStreamEvent::ReasoningEnd { id }));
        out.extend(self.text.drain(..).map(|id| UiStreamEvent::TextEnd { id }));
        if std::mem::take(&mut self.in_step) {
            out.push(UiStreamEvent::FinishStep);
        }
        out.push(UiStreamEvent::error(message));
        out.push(UiStreamEvent::finish(Some(FinishReason::Error)));
        self.started = true;
        self.finished = true;
        out
    }
}

async fn send_event(tx: &mpsc::Sender<Result<Bytes, Infallible>>, event: &UiStreamEvent) -> bool {
    match event.to_frame() {
        Ok(frame) => tx.send(Ok(Bytes::from(frame))).await.is_ok(),
        Err(e) => {
            warn!("cannot encode stream event: {e}");
            true
        }
    }
}
