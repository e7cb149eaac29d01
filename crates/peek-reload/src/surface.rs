//! Presentation surface capability.
//!
//! The reloader drives whatever is actually showing the content - a browser
//! page behind a WebSocket, a native webview, a test double - through this
//! trait. Load completion is reported out-of-band (the surface's transport
//! notifies the driver), not as part of [`Surface::load`].

use async_trait::async_trait;

/// Error from a presentation-surface request.
#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    /// No presentation surface is currently attached.
    #[error("no client attached to the presentation surface")]
    Detached,

    /// The surface dropped or mangled a request.
    #[error("surface request failed: {0}")]
    Request(String),
}

/// Capability to display content and manage its scroll position.
///
/// All methods are asynchronous suspension points: obtaining live state from
/// a rendering surface is not guaranteed synchronous.
#[async_trait]
pub trait Surface: Send + Sync {
    /// Begin loading the resource at `locator`.
    ///
    /// Returns once the load is *issued*; completion arrives separately
    /// through the surface's transport.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError`] if the load could not be issued at all.
    async fn load(&self, locator: &str) -> Result<(), SurfaceError>;

    /// Query the current scroll offset.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError`] if no answer can be obtained; callers fall
    /// back to offset zero.
    async fn query_offset(&self) -> Result<i64, SurfaceError>;

    /// Apply a previously captured scroll offset to the current content.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError`] if the offset could not be delivered.
    async fn apply_offset(&self, offset: i64) -> Result<(), SurfaceError>;
}
