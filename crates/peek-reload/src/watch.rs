//! Filesystem watch capability.
//!
//! A [`FileWatch`] observes a single file for externally-caused modifications
//! and delivers debounced change notifications on a worker thread. The
//! subscription is exclusively owned through a [`WatchHandle`]; dropping the
//! handle releases it.

use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;

/// Kind of change delivered by a watch.
///
/// Raw filesystem event kinds are collapsed to two outcomes: the target now
/// has new content, or the target is gone. Creates count as [`Changed`]
/// because editors commonly save through a write-temp-then-rename dance that
/// surfaces as a create event.
///
/// [`Changed`]: ChangeKind::Changed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    /// The watched file has new content.
    Changed,
    /// The watched file was removed.
    Removed,
}

/// Callback invoked with debounced change notifications.
///
/// Runs on a worker thread owned by the watch implementation, never on the
/// caller's context. Implementations must hand the notification off before
/// touching shared state.
pub type ChangeCallback = Box<dyn Fn(ChangeKind) + Send>;

/// Error establishing a filesystem watch.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// The path to watch does not exist or is not a regular file.
    #[error("watch target not found: {}", .0.display())]
    NotFound(PathBuf),

    /// I/O error resolving the watch target.
    #[error("failed to resolve watch target {}: {source}", .path.display())]
    Io {
        /// Path being resolved.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The watch backend refused the subscription.
    #[error("watch backend error: {0}")]
    Backend(#[from] notify::Error),
}

/// Capability to watch a single file for changes.
pub trait FileWatch: Send + Sync {
    /// Establish a watch on `path`.
    ///
    /// Raw events are coalesced over the `latency` window before `callback`
    /// is invoked. The watch stays alive until the returned handle is
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError`] if the path does not exist or the backend
    /// cannot establish the subscription. No watch is left behind on error.
    fn watch(
        &self,
        path: &std::path::Path,
        latency: Duration,
        callback: ChangeCallback,
    ) -> Result<WatchHandle, WatchError>;
}

/// Handle to an established watch.
///
/// Uses RAII - dropping the handle cancels the watch. Cancellation is
/// signalled by dropping the internal channel sender.
pub struct WatchHandle {
    _shutdown: Option<mpsc::Sender<()>>,
}

impl WatchHandle {
    /// Create a handle wrapping a shutdown signal sender.
    ///
    /// When the handle is dropped the sender is dropped with it, and the
    /// worker observing the paired receiver shuts down.
    pub(crate) fn new(shutdown: mpsc::Sender<()>) -> Self {
        Self {
            _shutdown: Some(shutdown),
        }
    }

    /// Cancel the watch immediately (consumes the handle).
    pub fn cancel(mut self) {
        self._shutdown.take();
    }
}
