use parking_lot::RwLock;
use shared::types::sse::SseError;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BroadcastError {
    #[error("Subscriber limit of {0} reached")]
    SubscriberLimit(usize),

    #[error("Subscriber failed: {0}")]
    HandlerFailed(String),

    #[error(transparent)]
    Sse(#[from] SseError),
}

/// Handle returned by [`Broadcaster::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler<E> = Arc<dyn Fn(&E) -> Result<(), BroadcastError> + Send + Sync>;

/// Outcome of one [`Broadcaster::publish`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: usize,
    pub failed: usize,
}

const UNBOUNDED: usize = usize::MAX;

/// Synchronous fan-out to every registered handler, in registration order.
///
/// Each publish works on a snapshot of the subscriber list, so handlers may
/// be added or removed while a publish is running. A handler that errors or
/// panics is logged and skipped; the remaining handlers still run and the
/// publisher never sees the failure.
pub struct Broadcaster<E> {
    subscribers: RwLock<Vec<(SubscriptionId, Handler<E>)>>,
    next_id: AtomicU64,
    max_subscribers: AtomicUsize,
}

impl<E> std::fmt::Debug for Broadcaster<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broadcaster")
            .field("subscribers", &self.subscriber_count())
            .field("max_subscribers", &self.max_subscribers())
            .finish()
    }
}

impl<E> Default for Broadcaster<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Broadcaster<E> {
    /// Broadcaster with no subscriber ceiling.
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(0),
            max_subscribers: AtomicUsize::new(UNBOUNDED),
        }
    }

    pub fn with_max_subscribers(max: Option<usize>) -> Self {
        let hub = Self::new();
        hub.set_max_subscribers(max);
        hub
    }

    /// Raise, lower or remove (`None`) the subscriber ceiling. Existing
    /// subscribers above a lowered ceiling are kept.
    pub fn set_max_subscribers(&self, max: Option<usize>) {
        self.max_subscribers
            .store(max.unwrap_or(UNBOUNDED), Ordering::SeqCst);
    }

    pub fn max_subscribers(&self) -> Option<usize> {
        match self.max_subscribers.load(Ordering::SeqCst) {
            UNBOUNDED => None,
            n => Some(n),
        }
    }

    pub fn subscribe<F>(&self, handler: F) -> Result<SubscriptionId, BroadcastError>
    where
        F: Fn(&E) -> Result<(), BroadcastError> + Send + Sync + 'static,
    {
        let mut subscribers = self.subscribers.write();
        let limit = self.max_subscribers.load(Ordering::SeqCst);
        if subscribers.len() >= limit {
            warn!("Rejecting subscriber: limit of {} reached", limit);
            return Err(BroadcastError::SubscriberLimit(limit));
        }

        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        subscribers.push((id, Arc::new(handler)));
        debug!("Subscriber {:?} registered ({} total)", id, subscribers.len());
        Ok(id)
    }

    /// Remove a handler. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        let removed = subscribers.len() != before;
        if removed {
            debug!("Subscriber {:?} removed ({} remaining)", id, subscribers.len());
        }
        removed
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    pub fn publish(&self, event: &E) -> PublishReport {
        let snapshot: Vec<(SubscriptionId, Handler<E>)> = self.subscribers.read().clone();
        let mut report = PublishReport::default();

        for (id, handler) in snapshot {
            match catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(e)) => {
                    warn!("Subscriber {:?} failed: {}", id, e);
                    report.failed += 1;
                }
                Err(_) => {
                    error!("Subscriber {:?} panicked during delivery", id);
                    report.failed += 1;
                }
            }
        }

        info!(
            "Published event to {} subscribers ({} failed)",
            report.delivered, report.failed
        );
        report
    }
}
