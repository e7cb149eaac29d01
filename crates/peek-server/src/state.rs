//! Application state.
//!
//! Shared state for all request handlers.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use peek_reload::{PreviewState, ReloaderHandle, StateFeed, Subscription, Token};

use crate::error::ServerError;
use crate::live::WsSurface;

/// Application state shared across all handlers.
pub(crate) struct AppState {
    /// WebSocket-backed presentation surface.
    pub(crate) surface: Arc<WsSurface>,
    /// Reloader driver handle (if live reload is enabled).
    pub(crate) reloader: Option<ReloaderHandle>,
    /// Upstream state feed; publishing arms the reloader.
    pub(crate) feed: StateFeed,
    /// The currently previewed document.
    pub(crate) current: RwLock<Option<PreviewState>>,
    /// Enable verbose output.
    pub(crate) verbose: bool,
    /// Application version for the status endpoint.
    pub(crate) version: String,
    /// Keeps the feed-to-reloader subscription alive for the server's
    /// lifetime.
    pub(crate) _feed_subscription: Option<Subscription>,
}

impl AppState {
    /// Check if live reload is enabled.
    #[must_use]
    pub(crate) fn live_reload_enabled(&self) -> bool {
        self.reloader.is_some()
    }

    /// Switch the previewed document to `path`.
    ///
    /// Validates the path, mints a fresh session token, records the new
    /// state, and publishes it through the feed (which arms the reloader
    /// when live reload is enabled). Returns the published state.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::FileNotFound`] if `path` is not a regular
    /// file.
    pub(crate) fn select_file(&self, path: &Path) -> Result<PreviewState, ServerError> {
        if !path.is_file() {
            return Err(ServerError::FileNotFound(path.to_path_buf()));
        }
        let watch_path = path.canonicalize()?;

        let token = Token::new();
        let preview = PreviewState {
            resource: format!("/content?v={token}"),
            watch_path,
            token,
        };

        *self.current.write().unwrap() = Some(preview.clone());
        self.feed.publish(&preview);

        if self.verbose {
            tracing::info!(path = %preview.watch_path.display(), token = %preview.token, "document selected");
        }

        Ok(preview)
    }

    /// Path of the currently previewed document, if any.
    #[must_use]
    pub(crate) fn current_path(&self) -> Option<PathBuf> {
        self.current
            .read()
            .unwrap()
            .as_ref()
            .map(|p| p.watch_path.clone())
    }
}
