//! Router construction.
//!
//! Builds the axum router with all routes and middleware.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower::ServiceBuilder;

use crate::handlers;
use crate::live;
use crate::middleware::security;
use crate::state::AppState;

/// Create the application router.
///
/// # Arguments
///
/// * `state` - Shared application state
pub(crate) fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route("/api/status", get(handlers::api::get_status))
        .route("/api/file", post(handlers::api::select_file));

    let mut router = Router::new()
        .route("/", get(handlers::preview::get_shell))
        .route("/content", get(handlers::preview::get_content))
        .merge(api_routes);

    // WebSocket transport only exists when live reload is enabled
    if state.live_reload_enabled() {
        router = router.route("/ws", get(live::ws_handler));
    }

    // Add security headers middleware
    router
        .layer(
            ServiceBuilder::new()
                .layer(security::csp_layer())
                .layer(security::content_type_options_layer())
                .layer(security::frame_options_layer()),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::WsSurface;
    use peek_reload::StateFeed;
    use std::sync::RwLock;

    fn test_state() -> Arc<AppState> {
        Arc::new(AppState {
            surface: Arc::new(WsSurface::new()),
            reloader: None,
            feed: StateFeed::new(),
            current: RwLock::new(None),
            verbose: false,
            version: "0.0.0".to_owned(),
            _feed_subscription: None,
        })
    }

    #[test]
    fn test_router_builds_without_live_reload() {
        let _router = create_router(test_state());
    }
}
