//! WebSocket transport and the surface it implements.
//!
//! The browser shell is the presentation surface; [`WsSurface`] adapts it to
//! the [`Surface`] trait. Server-to-client messages are broadcast to every
//! connected shell; the scroll-offset query is answered by whichever shell
//! replies first.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, oneshot};

use peek_reload::{Surface, SurfaceError, Token};

use crate::state::AppState;

/// Capacity of the outbound broadcast channel.
const OUTBOUND_CAPACITY: usize = 64;

/// Message sent to connected shells.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum ServerMessage {
    /// Navigate the preview frame to `locator`.
    Load {
        /// Content locator, cache-busted with the session token.
        locator: String,
    },
    /// Ask for the current scroll offset.
    QueryOffset,
    /// Restore a previously captured scroll offset.
    ApplyOffset {
        /// Offset in CSS pixels.
        value: i64,
    },
}

/// Message received from a shell.
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum ClientMessage {
    /// Reply to a [`ServerMessage::QueryOffset`].
    Offset {
        /// Offset in CSS pixels.
        value: i64,
    },
    /// The preview frame finished loading content.
    Loaded {
        /// Session token observed on the loaded content.
        token: String,
    },
}

/// WebSocket-backed presentation surface.
///
/// Loads and offset restores fan out to every connected shell; the offset
/// query parks a oneshot sender in a single slot and resolves it with the
/// first reply. The reloader serializes its queries, so at most one is
/// outstanding; a newer query displacing an unanswered one drops the old
/// sender, and the abandoned caller falls back to offset zero.
pub(crate) struct WsSurface {
    outbound: broadcast::Sender<ServerMessage>,
    pending_offset: Mutex<Option<oneshot::Sender<i64>>>,
}

impl WsSurface {
    /// Create a surface with no connected shells.
    pub(crate) fn new() -> Self {
        let (outbound, _) = broadcast::channel(OUTBOUND_CAPACITY);
        Self {
            outbound,
            pending_offset: Mutex::new(None),
        }
    }

    /// Subscribe to outbound messages (one receiver per connected shell).
    pub(crate) fn subscribe(&self) -> broadcast::Receiver<ServerMessage> {
        self.outbound.subscribe()
    }

    /// Number of connected shells.
    pub(crate) fn client_count(&self) -> usize {
        self.outbound.receiver_count()
    }

    /// Resolve an outstanding offset query.
    ///
    /// Extra replies (several shells answering) are dropped.
    pub(crate) fn resolve_offset(&self, value: i64) {
        if let Some(reply) = self.pending_offset.lock().unwrap().take() {
            let _ = reply.send(value);
        }
    }

    /// Called after a shell disconnects.
    ///
    /// With no shells left, an outstanding offset query can never be
    /// answered; dropping the sender lets the caller fall back to zero.
    pub(crate) fn note_disconnect(&self) {
        if self.client_count() == 0 {
            self.pending_offset.lock().unwrap().take();
        }
    }
}

#[async_trait]
impl Surface for WsSurface {
    async fn load(&self, locator: &str) -> Result<(), SurfaceError> {
        self.outbound
            .send(ServerMessage::Load {
                locator: locator.to_owned(),
            })
            .map_err(|_| SurfaceError::Detached)?;
        Ok(())
    }

    async fn query_offset(&self) -> Result<i64, SurfaceError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        *self.pending_offset.lock().unwrap() = Some(reply_tx);

        if self.outbound.send(ServerMessage::QueryOffset).is_err() {
            self.pending_offset.lock().unwrap().take();
            return Err(SurfaceError::Detached);
        }

        reply_rx
            .await
            .map_err(|_| SurfaceError::Request("offset reply channel closed".to_owned()))
    }

    async fn apply_offset(&self, offset: i64) -> Result<(), SurfaceError> {
        self.outbound
            .send(ServerMessage::ApplyOffset { value: offset })
            .map_err(|_| SurfaceError::Detached)?;
        Ok(())
    }
}

/// Handle WebSocket upgrade for the live reload transport.
pub(crate) async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Handle an established WebSocket connection.
async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let mut outbound = state.surface.subscribe();
    tracing::debug!(clients = state.surface.client_count(), "shell connected");

    loop {
        tokio::select! {
            // Forward surface messages to the shell
            result = outbound.recv() => {
                match result {
                    Ok(message) => {
                        let text = serde_json::to_string(&message).unwrap();
                        if socket.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(_)) => {}
                }
            }
            // Handle shell messages
            result = socket.recv() => {
                match result {
                    Some(Ok(Message::Text(text))) => handle_client_message(&state, &text),
                    Some(Ok(_)) => {}
                    _ => break,
                }
            }
        }
    }

    drop(outbound);
    state.surface.note_disconnect();
    tracing::debug!(clients = state.surface.client_count(), "shell disconnected");
}

/// Dispatch one message from a shell.
fn handle_client_message(state: &AppState, text: &str) {
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(err) => {
            tracing::debug!(%err, "unparseable shell message dropped");
            return;
        }
    };

    match message {
        ClientMessage::Offset { value } => state.surface.resolve_offset(value),
        ClientMessage::Loaded { token } => {
            let Some(reloader) = &state.reloader else {
                return;
            };
            match Token::parse(&token) {
                Some(cycle) => reloader.load_finished(Some(cycle)),
                None => tracing::debug!(%token, "load completion with unparseable token dropped"),
            }
        }
    }
}
