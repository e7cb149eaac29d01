//! JSON API endpoints.

use std::path::PathBuf;
use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use peek_reload::ReloadState;

use crate::error::ServerError;
use crate::state::AppState;

/// Request body for POST /api/file.
#[derive(Debug, Deserialize)]
pub(crate) struct SelectRequest {
    /// Path of the file to preview.
    pub(crate) path: PathBuf,
}

/// Response for POST /api/file.
#[derive(Debug, Serialize)]
pub(crate) struct SelectResponse {
    /// Canonical path of the selected file.
    path: String,
    /// Session token of the new watch/reload cycle.
    token: String,
}

/// Response for GET /api/status.
#[derive(Debug, Serialize)]
pub(crate) struct StatusResponse {
    /// Reload cycle state.
    state: &'static str,
    /// Currently previewed file, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    file: Option<String>,
    /// Whether live reload is enabled.
    live_reload: bool,
    /// Connected shell count.
    clients: usize,
    /// Application version.
    version: String,
}

/// Map a reload state onto its wire name.
fn state_name(state: Option<ReloadState>) -> &'static str {
    match state {
        None | Some(ReloadState::Idle) => "idle",
        Some(ReloadState::Armed) => "armed",
        Some(ReloadState::ReloadInFlight) => "reload_in_flight",
    }
}

/// Handle POST /api/file.
pub(crate) async fn select_file(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SelectRequest>,
) -> Result<Json<SelectResponse>, ServerError> {
    let preview = state.select_file(&request.path)?;

    Ok(Json(SelectResponse {
        path: preview.watch_path.display().to_string(),
        token: preview.token.to_string(),
    }))
}

/// Handle GET /api/status.
pub(crate) async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        state: state_name(state.reloader.as_ref().map(peek_reload::ReloaderHandle::state)),
        file: state.current_path().map(|p| p.display().to_string()),
        live_reload: state.live_reload_enabled(),
        clients: state.surface.client_count(),
        version: state.version.clone(),
    })
}
