//! Event debouncing for change notifications.
//!
//! Coalesces bursts of raw filesystem events into a single logical change,
//! so that an editor emitting several events per save produces one reload.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::watch::ChangeKind;

/// Pending change waiting out its debounce window.
struct Pending {
    kind: ChangeKind,
    deadline: Instant,
}

/// Thread-safe single-target debouncer.
///
/// A reloader watches exactly one file, so a single pending slot suffices:
/// each raw event overwrites the pending kind (the latest filesystem state
/// wins - a file changed then removed is removed, a file removed then
/// recreated is changed) and pushes the deadline out by the window.
pub struct ChangeDebouncer {
    slot: Mutex<Option<Pending>>,
    window: Duration,
}

impl ChangeDebouncer {
    /// Create a debouncer with the given minimum-latency window.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            slot: Mutex::new(None),
            window,
        }
    }

    /// Record a raw event.
    ///
    /// Thread-safe, callable from the watch backend's callback.
    pub fn record(&self, kind: ChangeKind) {
        let mut slot = self.slot.lock().unwrap();
        *slot = Some(Pending {
            kind,
            deadline: Instant::now() + self.window,
        });
    }

    /// Take the pending change if its debounce deadline has passed.
    ///
    /// Thread-safe, called from the drain loop.
    pub fn take_ready(&self) -> Option<ChangeKind> {
        let mut slot = self.slot.lock().unwrap();
        if slot.as_ref().is_some_and(|p| p.deadline <= Instant::now()) {
            slot.take().map(|p| p.kind)
        } else {
            None
        }
    }
}
