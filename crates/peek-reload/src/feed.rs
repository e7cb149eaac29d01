//! Upstream state feed.
//!
//! The application's authoritative state (which file is being previewed,
//! under which session token) is pushed through a [`StateFeed`]. Observers
//! are invoked synchronously on each transition and treat every delivery as
//! a candidate arm call; the reloader's token check makes redeliveries
//! harmless.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use crate::token::Token;

/// One authoritative preview state.
#[derive(Clone, Debug)]
pub struct PreviewState {
    /// Locator the surface should display.
    pub resource: String,
    /// Filesystem path to observe for changes.
    pub watch_path: PathBuf,
    /// Session token distinguishing this activation from any previous one.
    pub token: Token,
}

type Observer = Box<dyn Fn(&PreviewState) + Send + Sync>;

#[derive(Default)]
struct FeedInner {
    observers: Mutex<Vec<(u64, Observer)>>,
    next_id: AtomicU64,
}

/// Publisher of preview-state transitions.
///
/// Cheap to clone; all clones publish to the same observers.
#[derive(Clone, Default)]
pub struct StateFeed {
    inner: Arc<FeedInner>,
}

impl StateFeed {
    /// Create an empty feed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer.
    ///
    /// The observer runs synchronously on the publishing thread for every
    /// subsequent [`publish`](Self::publish) until the returned
    /// [`Subscription`] is dropped.
    #[must_use]
    pub fn subscribe(&self, observer: impl Fn(&PreviewState) + Send + Sync + 'static) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .observers
            .lock()
            .unwrap()
            .push((id, Box::new(observer)));
        Subscription {
            id,
            feed: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver `state` to every registered observer, in subscription order.
    pub fn publish(&self, state: &PreviewState) {
        let observers = self.inner.observers.lock().unwrap();
        for (_, observer) in observers.iter() {
            observer(state);
        }
    }

    #[cfg(test)]
    fn observer_count(&self) -> usize {
        self.inner.observers.lock().unwrap().len()
    }
}

/// Handle to a feed subscription.
///
/// Uses RAII - dropping the handle unsubscribes the observer.
pub struct Subscription {
    id: u64,
    feed: Weak<FeedInner>,
}

impl Subscription {
    /// Unsubscribe immediately (consumes the handle).
    pub fn dispose(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.feed.upgrade() {
            inner.observers.lock().unwrap().retain(|(id, _)| *id != self.id);
        }
    }
}
