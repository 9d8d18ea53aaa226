use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use http_body_util::{BodyExt, StreamBody, combinators::BoxBody};
use hyper::{Response, StatusCode, body::Frame};
use parking_lot::Mutex;
use shared::types::{BUILD_END_EVENT, BuildEvent, format_frame};
use shared::types::sse::SseError;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::AppState;
use crate::broadcast::{BroadcastError, Broadcaster, SubscriptionId};
use crate::handlers::utils::{add_event_stream_headers, deliver_text};

// ---------------------------------------------------------------------------
// Subscription lifetime
// ---------------------------------------------------------------------------

/// Unregisters a stream's handler when the stream is dropped, which is how
/// hyper reports that the client went away.
pub struct SubscriptionGuard {
    broadcaster: Arc<Broadcaster<BuildEvent>>,
    id: SubscriptionId,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.broadcaster.unsubscribe(self.id);
        info!(
            "Event stream {:?} closed ({} still open)",
            self.id,
            self.broadcaster.subscriber_count()
        );
    }
}

// ---------------------------------------------------------------------------
// Stream
// ---------------------------------------------------------------------------

/// Subscriber handler that frames each event with the next id from its own
/// counter. The id only advances once the frame is queued.
fn frame_sender(
    tx: mpsc::UnboundedSender<Bytes>,
) -> impl Fn(&BuildEvent) -> Result<(), BroadcastError> + Send + Sync + 'static {
    let sequence = Mutex::new(0u64);
    move |event: &BuildEvent| {
        let mut next = sequence.lock();
        let frame = format_frame(BUILD_END_EVENT, event, *next)?;
        tx.send(Bytes::from(frame))
            .map_err(|_| BroadcastError::Sse(SseError::ChannelClosed))?;
        *next += 1;
        Ok(())
    }
}

/// Register a subscriber and return the stream of encoded frames for it.
///
/// Each subscriber owns its sequence counter, starting at 0 and advancing by
/// one per delivered frame. The stream ends when the broadcaster drops the
/// handler or after `idle_timeout` without a frame.
pub fn open_stream(
    broadcaster: Arc<Broadcaster<BuildEvent>>,
    idle_timeout: Duration,
) -> Result<impl Stream<Item = Bytes> + Send + 'static, BroadcastError> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Bytes>();
    let id = broadcaster.subscribe(frame_sender(tx))?;

    info!(
        "Event stream {:?} opened ({} open)",
        id,
        broadcaster.subscriber_count()
    );

    let guard = SubscriptionGuard { broadcaster, id };

    Ok(async_stream::stream! {
        let _guard = guard;
        loop {
            match tokio::time::timeout(idle_timeout, rx.recv()).await {
                Ok(Some(frame)) => yield frame,
                Ok(None) => break,
                Err(_) => {
                    warn!("Event stream {:?} idle for {:?}, closing", id, idle_timeout);
                    break;
                }
            }
        }
    })
}

// ---------------------------------------------------------------------------
// Handler
// ---------------------------------------------------------------------------

/// Upgrade the request to a build-event stream.
///
/// Headers go out as soon as the response is returned, before any frame, so
/// the client sees the connection as open immediately. A full subscriber
/// table yields 503.
pub async fn handle_build_events(
    state: AppState,
) -> anyhow::Result<Response<BoxBody<Bytes, Infallible>>> {
    let idle_timeout = Duration::from_secs(state.config.server.idle_timeout_secs);

    let stream = match open_stream(Arc::clone(&state.broadcaster), idle_timeout) {
        Ok(stream) => stream,
        Err(BroadcastError::SubscriberLimit(limit)) => {
            return deliver_text(
                StatusCode::SERVICE_UNAVAILABLE,
                format!("Too many open event streams (limit {})", limit),
            );
        }
        Err(e) => {
            error!("Failed to open event stream: {}", e);
            return deliver_text(StatusCode::INTERNAL_SERVER_ERROR, "Failed to open stream");
        }
    };

    let body = BodyExt::boxed(StreamBody::new(
        stream.map(|frame| Ok::<_, Infallible>(Frame::data(frame))),
    ));

    let res = Response::builder()
        .status(StatusCode::OK)
        .body(body)
        .map_err(|e| {
            error!("Failed to build event-stream response: {}", e);
            anyhow::anyhow!("Failed to build event-stream response: {}", e)
        })?;

    Ok(add_event_stream_headers(res))
}
