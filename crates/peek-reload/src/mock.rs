//! Mock collaborators for testing.
//!
//! Provides [`MockSurface`] and [`MockWatch`] so the reload protocol can be
//! exercised without a browser or a filesystem.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, mpsc};
use std::time::Duration;

use async_trait::async_trait;

use crate::surface::{Surface, SurfaceError};
use crate::watch::{ChangeCallback, ChangeKind, FileWatch, WatchError, WatchHandle};

/// In-memory presentation surface.
///
/// Records every load and applied offset; offset queries and loads can be
/// scripted to fail.
///
/// # Example
///
/// ```ignore
/// let surface = MockSurface::new().with_offset(120);
/// // ... drive a Reloader ...
/// assert_eq!(surface.loads().len(), 1);
/// assert_eq!(surface.applied(), vec![120]);
/// ```
#[derive(Debug, Default)]
pub struct MockSurface {
    loads: Mutex<Vec<String>>,
    applied: Mutex<Vec<i64>>,
    offset: Mutex<i64>,
    fail_offset: Mutex<bool>,
    fail_load: Mutex<bool>,
}

impl MockSurface {
    /// Create a surface reporting offset zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `offset` from every offset query.
    #[must_use]
    pub fn with_offset(self, offset: i64) -> Self {
        *self.offset.lock().unwrap() = offset;
        self
    }

    /// Make every offset query fail.
    #[must_use]
    pub fn with_offset_failure(self) -> Self {
        *self.fail_offset.lock().unwrap() = true;
        self
    }

    /// Make every load fail.
    #[must_use]
    pub fn with_load_failure(self) -> Self {
        *self.fail_load.lock().unwrap() = true;
        self
    }

    /// Locators loaded so far, in order.
    #[must_use]
    pub fn loads(&self) -> Vec<String> {
        self.loads.lock().unwrap().clone()
    }

    /// Offsets applied so far, in order.
    #[must_use]
    pub fn applied(&self) -> Vec<i64> {
        self.applied.lock().unwrap().clone()
    }
}

#[async_trait]
impl Surface for MockSurface {
    async fn load(&self, locator: &str) -> Result<(), SurfaceError> {
        if *self.fail_load.lock().unwrap() {
            return Err(SurfaceError::Detached);
        }
        self.loads.lock().unwrap().push(locator.to_owned());
        Ok(())
    }

    async fn query_offset(&self) -> Result<i64, SurfaceError> {
        if *self.fail_offset.lock().unwrap() {
            return Err(SurfaceError::Detached);
        }
        Ok(*self.offset.lock().unwrap())
    }

    async fn apply_offset(&self, offset: i64) -> Result<(), SurfaceError> {
        self.applied.lock().unwrap().push(offset);
        Ok(())
    }
}

/// One registered mock watch.
struct WatchEntry {
    path: PathBuf,
    latency: Duration,
    callback: ChangeCallback,
    /// Paired with the sender inside the issued [`WatchHandle`]; once the
    /// handle is dropped this reports Disconnected.
    alive: mpsc::Receiver<()>,
}

impl WatchEntry {
    fn is_active(&self) -> bool {
        matches!(self.alive.try_recv(), Err(mpsc::TryRecvError::Empty))
    }
}

/// In-memory filesystem watch.
///
/// Records every watch established and lets tests fire change notifications
/// through the most recent live callback.
#[derive(Default)]
pub struct MockWatch {
    entries: Mutex<Vec<WatchEntry>>,
    fail: Mutex<bool>,
}

impl MockWatch {
    /// Create a watch factory that accepts every target.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every watch attempt fail.
    #[must_use]
    pub fn with_failure(self) -> Self {
        *self.fail.lock().unwrap() = true;
        self
    }

    /// Total watches ever established.
    #[must_use]
    pub fn watch_count(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// Watches whose handle has not been dropped.
    #[must_use]
    pub fn active_watches(&self) -> usize {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.is_active())
            .count()
    }

    /// Path of the most recently established watch.
    #[must_use]
    pub fn last_path(&self) -> Option<PathBuf> {
        self.entries.lock().unwrap().last().map(|e| e.path.clone())
    }

    /// Latency of the most recently established watch.
    #[must_use]
    pub fn last_latency(&self) -> Option<Duration> {
        self.entries.lock().unwrap().last().map(|e| e.latency)
    }

    /// Deliver a change notification through the newest live watch.
    ///
    /// Does nothing when no watch is active, mirroring a real backend whose
    /// subscription has been released.
    pub fn fire(&self, kind: ChangeKind) {
        let entries = self.entries.lock().unwrap();
        if let Some(entry) = entries.iter().rev().find(|e| e.is_active()) {
            (entry.callback)(kind);
        }
    }
}

impl FileWatch for MockWatch {
    fn watch(
        &self,
        path: &Path,
        latency: Duration,
        callback: ChangeCallback,
    ) -> Result<WatchHandle, WatchError> {
        if *self.fail.lock().unwrap() {
            return Err(WatchError::NotFound(path.to_path_buf()));
        }
        let (alive_tx, alive_rx) = mpsc::channel();
        self.entries.lock().unwrap().push(WatchEntry {
            path: path.to_path_buf(),
            latency,
            callback,
            alive: alive_rx,
        });
        Ok(WatchHandle::new(alive_tx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_mock_surface_records_loads_and_offsets() {
        let surface = MockSurface::new().with_offset(33);

        surface.load("/content/a").await.unwrap();
        let offset = surface.query_offset().await.unwrap();
        surface.apply_offset(offset).await.unwrap();

        assert_eq!(surface.loads(), vec!["/content/a".to_owned()]);
        assert_eq!(surface.applied(), vec![33]);
    }

    #[tokio::test]
    async fn test_mock_surface_scripted_failures() {
        let surface = MockSurface::new().with_offset_failure().with_load_failure();

        assert!(surface.query_offset().await.is_err());
        assert!(surface.load("/content/a").await.is_err());
        assert!(surface.loads().is_empty());
    }

    #[test]
    fn test_mock_watch_tracks_handle_lifetime() {
        let watcher = MockWatch::new();

        let handle = watcher
            .watch(Path::new("/tmp/a.html"), Duration::ZERO, Box::new(|_| {}))
            .unwrap();
        assert_eq!(watcher.active_watches(), 1);

        drop(handle);
        assert_eq!(watcher.active_watches(), 0);
        assert_eq!(watcher.watch_count(), 1);
    }

    #[test]
    fn test_mock_watch_fires_newest_live_callback() {
        let watcher = MockWatch::new();
        let (tx, rx) = mpsc::channel();

        let _stale = watcher
            .watch(Path::new("/tmp/a.html"), Duration::ZERO, Box::new(|_| {}))
            .unwrap();
        let _live = watcher
            .watch(
                Path::new("/tmp/b.html"),
                Duration::ZERO,
                Box::new(move |kind| tx.send(kind).unwrap()),
            )
            .unwrap();

        watcher.fire(ChangeKind::Changed);

        assert_eq!(rx.try_recv(), Ok(ChangeKind::Changed));
    }
}
