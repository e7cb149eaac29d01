//! HTTP preview server for peek.
//!
//! Serves a single HTML file to the browser and keeps it fresh:
//! - `GET /` - the preview shell (embedded HTML/JS)
//! - `GET /content` - the currently previewed file
//! - `GET /ws` - WebSocket carrying reload and scroll-preservation messages
//! - `GET /api/status`, `POST /api/file` - JSON API
//!
//! # Architecture
//!
//! ```text
//! Browser shell ──WS──► WsSurface (Surface impl)
//!                           ▲
//!                           │ load / query_offset / apply_offset
//!                    Reloader driver ◄── notify watch (peek-reload)
//!                           ▲
//!                           │ arm(target, token)
//!                      StateFeed ◄── POST /api/file
//! ```

mod app;
mod error;
mod handlers;
mod live;
mod middleware;
mod shell;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use peek_reload::{FileWatch, FsWatch, StateFeed, Surface, WatchTarget, driver};

use live::WsSurface;
use state::AppState;

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// File to preview at startup (`None` starts without a document).
    pub file: Option<PathBuf>,
    /// Minimum latency window for coalescing filesystem events.
    pub debounce_ms: u64,
    /// Enable live reload.
    pub live_reload_enabled: bool,
    /// Enable verbose output.
    pub verbose: bool,
    /// Application version (reported by the status endpoint).
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 7878,
            file: None,
            debounce_ms: 1000,
            live_reload_enabled: true,
            verbose: false,
            version: String::new(),
        }
    }
}

/// Run the server.
///
/// # Errors
///
/// Returns an error if the startup file is invalid or the server fails to
/// bind.
pub async fn run_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let surface = Arc::new(WsSurface::new());
    let feed = StateFeed::new();

    // Live reload disabled means no watcher and no reloader at all; the
    // shell still loads content once per visit.
    let (reloader, feed_subscription) = if config.live_reload_enabled {
        let watcher: Arc<dyn FileWatch> = Arc::new(FsWatch::new());
        let handle = driver::spawn(
            Arc::clone(&surface) as Arc<dyn Surface>,
            watcher,
            Duration::from_millis(config.debounce_ms),
        );

        // Every upstream state transition is a candidate arm call.
        let handle_for_feed = handle.clone();
        let subscription = feed.subscribe(move |preview| {
            handle_for_feed.arm(
                WatchTarget::new(preview.resource.clone(), preview.watch_path.clone()),
                preview.token.clone(),
            );
        });

        (Some(handle), Some(subscription))
    } else {
        (None, None)
    };

    let state = Arc::new(AppState {
        surface,
        reloader,
        feed,
        current: RwLock::new(None),
        verbose: config.verbose,
        version: config.version.clone(),
        _feed_subscription: feed_subscription,
    });

    if let Some(file) = &config.file {
        state.select_file(file)?;
    }

    let app = app::create_router(Arc::clone(&state));

    let addr = SocketAddr::from_str(&format!("{}:{}", config.host, config.port))?;
    tracing::info!(address = %addr, "Starting preview server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Wait for shutdown signal (Ctrl-C).
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
