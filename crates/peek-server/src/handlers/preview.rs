//! Preview shell and content endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::response::{Html, IntoResponse};

use crate::error::ServerError;
use crate::shell;
use crate::state::AppState;

/// Handle GET / (the preview shell).
pub(crate) async fn get_shell() -> Html<&'static str> {
    Html(shell::SHELL_HTML)
}

/// Handle GET /content (the previewed document).
///
/// Re-reads the file on every request; the `v` query parameter only busts
/// the frame's cache and needs no handling here.
pub(crate) async fn get_content(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ServerError> {
    let Some(path) = state.current_path() else {
        return Ok(Html(shell::NO_DOCUMENT_HTML.to_owned()));
    };

    let content = tokio::fs::read_to_string(&path)
        .await
        .map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => ServerError::FileNotFound(path),
            _ => ServerError::Io(err),
        })?;

    Ok(Html(content))
}
