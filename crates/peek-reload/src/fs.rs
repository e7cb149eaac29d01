//! Filesystem watch backed by `notify`.

use std::path::Path;
use std::sync::{Arc, mpsc};
use std::time::Duration;

use notify::{RecursiveMode, Watcher};

use crate::debounce::ChangeDebouncer;
use crate::watch::{ChangeCallback, ChangeKind, FileWatch, WatchError, WatchHandle};

/// How often the drain loop checks for ready events and shutdown.
const DRAIN_INTERVAL: Duration = Duration::from_millis(50);

/// Convert a `notify::EventKind` to a [`ChangeKind`].
///
/// Returns `None` for event kinds that are not relevant (e.g. Access).
fn change_kind(kind: notify::EventKind) -> Option<ChangeKind> {
    match kind {
        notify::EventKind::Create(_) | notify::EventKind::Modify(_) => Some(ChangeKind::Changed),
        notify::EventKind::Remove(_) => Some(ChangeKind::Removed),
        _ => None,
    }
}

/// Filesystem watch implementation.
///
/// Watches the target's parent directory non-recursively and filters events
/// to the target's file name. Editors replace files via write-temp-then-rename,
/// which would orphan a watch placed on the file itself; matching by name
/// keeps the subscription alive across replacement.
#[derive(Default)]
pub struct FsWatch;

impl FsWatch {
    /// Create a new filesystem watch factory.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl FileWatch for FsWatch {
    fn watch(
        &self,
        path: &Path,
        latency: Duration,
        callback: ChangeCallback,
    ) -> Result<WatchHandle, WatchError> {
        if !path.is_file() {
            return Err(WatchError::NotFound(path.to_path_buf()));
        }
        let target = path.canonicalize().map_err(|source| WatchError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let parent = target
            .parent()
            .ok_or_else(|| WatchError::NotFound(target.clone()))?
            .to_path_buf();
        let file_name = target
            .file_name()
            .ok_or_else(|| WatchError::NotFound(target.clone()))?
            .to_owned();

        let debouncer = Arc::new(ChangeDebouncer::new(latency));
        let debouncer_for_record = Arc::clone(&debouncer);

        let mut watcher =
            notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
                let Ok(event) = res else { return };
                let Some(kind) = change_kind(event.kind) else {
                    return;
                };
                if event
                    .paths
                    .iter()
                    .any(|p| p.file_name().is_some_and(|n| n == file_name.as_os_str()))
                {
                    debouncer_for_record.record(kind);
                }
            })?;

        watcher.watch(&parent, RecursiveMode::NonRecursive)?;

        // Shutdown channel; dropping the handle drops the sender, which the
        // drain loop observes as Disconnected.
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let watched = target.clone();
        std::thread::spawn(move || {
            // Keep the notify watcher alive for the lifetime of this thread.
            let _watcher = watcher;

            loop {
                match shutdown_rx.recv_timeout(DRAIN_INTERVAL) {
                    Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
                    Err(mpsc::RecvTimeoutError::Timeout) => {}
                }

                if let Some(kind) = debouncer.take_ready() {
                    tracing::debug!(path = %watched.display(), ?kind, "debounced change delivered");
                    callback(kind);
                }
            }

            tracing::debug!(path = %watched.display(), "watch released");
        });

        Ok(WatchHandle::new(shutdown_tx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;

    fn counting_callback() -> (ChangeCallback, Arc<Mutex<Vec<ChangeKind>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_for_cb = Arc::clone(&seen);
        let cb: ChangeCallback = Box::new(move |kind| {
            seen_for_cb.lock().unwrap().push(kind);
        });
        (cb, seen)
    }

    #[test]
    fn test_watch_missing_file_fails() {
        let watcher = FsWatch::new();
        let (cb, _seen) = counting_callback();

        let result = watcher.watch(Path::new("/nonexistent/file.html"), Duration::ZERO, cb);

        assert!(matches!(result, Err(WatchError::NotFound(_))));
    }

    #[test]
    fn test_watch_directory_fails() {
        let temp_dir = tempfile::tempdir().unwrap();
        let watcher = FsWatch::new();
        let (cb, _seen) = counting_callback();

        let result = watcher.watch(temp_dir.path(), Duration::ZERO, cb);

        assert!(matches!(result, Err(WatchError::NotFound(_))));
    }

    #[test]
    fn test_watch_existing_file_succeeds() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("page.html");
        fs::write(&file, "<html></html>").unwrap();

        let watcher = FsWatch::new();
        let (cb, _seen) = counting_callback();

        let handle = watcher.watch(&file, Duration::from_millis(20), cb);
        assert!(handle.is_ok());
    }

    // Note: the notification tests below are timing-sensitive and can be
    // flaky in constrained test environments, so they are ignored by default.
    // The drain loop follows the same pattern as the watch() implementation
    // in the storage layer this was derived from.
    #[test]
    #[ignore]
    fn test_watch_delivers_debounced_change() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("page.html");
        fs::write(&file, "one").unwrap();

        let watcher = FsWatch::new();
        let (cb, seen) = counting_callback();
        let _handle = watcher.watch(&file, Duration::from_millis(50), cb).unwrap();

        // Let the backend settle before generating events
        std::thread::sleep(Duration::from_millis(200));

        // Two writes inside the window collapse into one notification
        fs::write(&file, "two").unwrap();
        std::thread::sleep(Duration::from_millis(10));
        fs::write(&file, "three").unwrap();

        std::thread::sleep(Duration::from_millis(500));

        assert_eq!(seen.lock().unwrap().as_slice(), &[ChangeKind::Changed]);
    }

    #[test]
    #[ignore]
    fn test_dropping_handle_stops_delivery() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("page.html");
        fs::write(&file, "one").unwrap();

        let watcher = FsWatch::new();
        let (cb, seen) = counting_callback();
        let handle = watcher.watch(&file, Duration::from_millis(20), cb).unwrap();

        std::thread::sleep(Duration::from_millis(200));
        drop(handle);
        std::thread::sleep(Duration::from_millis(100));

        fs::write(&file, "two").unwrap();
        std::thread::sleep(Duration::from_millis(300));

        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    #[ignore]
    fn test_ignores_sibling_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("page.html");
        let sibling = temp_dir.path().join("other.html");
        fs::write(&file, "one").unwrap();

        let watcher = FsWatch::new();
        let (cb, seen) = counting_callback();
        let _handle = watcher.watch(&file, Duration::from_millis(20), cb).unwrap();

        std::thread::sleep(Duration::from_millis(200));
        fs::write(&sibling, "noise").unwrap();
        std::thread::sleep(Duration::from_millis(300));

        assert!(seen.lock().unwrap().is_empty());
    }
}
