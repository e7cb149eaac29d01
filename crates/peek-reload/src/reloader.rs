//! The external-change reload state machine.
//!
//! A [`Reloader`] owns the binding between the resource currently shown on a
//! [`Surface`] and the filesystem path watched for changes to it. Arming
//! replaces that binding under a fresh [`Token`]; debounced watch
//! notifications trigger reloads that preserve the surface's scroll offset.
//!
//! The struct is single-owner and not internally synchronized; see
//! [`driver`](crate::driver) for the task that serializes watch callbacks and
//! commands onto one consumer.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::surface::{Surface, SurfaceError};
use crate::token::Token;
use crate::watch::{ChangeCallback, ChangeKind, FileWatch, WatchError, WatchHandle};

/// Where the reloader is in its cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReloadState {
    /// No watch is active.
    Idle,
    /// A watch is active and the content is believed current.
    Armed,
    /// A reload has been dispatched and its completion is outstanding.
    ReloadInFlight,
}

/// What to display and what to observe for changes to it.
///
/// The resource is assumed derived from the watched path; the two must refer
/// to consistent state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WatchTarget {
    /// Locator the surface loads (e.g. a content URL).
    pub resource: String,
    /// Filesystem path observed for changes.
    pub watch_path: PathBuf,
}

impl WatchTarget {
    /// Create a watch target.
    pub fn new(resource: impl Into<String>, watch_path: impl Into<PathBuf>) -> Self {
        Self {
            resource: resource.into(),
            watch_path: watch_path.into(),
        }
    }
}

/// A debounced watch notification, stamped with the token of the watch that
/// produced it.
#[derive(Clone, Debug)]
pub struct Fired {
    /// Token active when the watch was established.
    pub token: Token,
    /// What happened to the file.
    pub kind: ChangeKind,
}

/// Error from arming or reloading.
#[derive(Debug, thiserror::Error)]
pub enum ReloadError {
    /// The watch could not be established; the reloader is left disarmed.
    #[error(transparent)]
    Watch(#[from] WatchError),

    /// The content load could not be issued; the watch remains armed and the
    /// next change notification retries implicitly.
    #[error("content load failed: {0}")]
    Load(#[source] SurfaceError),
}

/// The currently armed watch.
struct ActiveWatch {
    token: Token,
    target: WatchTarget,
    /// Dropping this releases the filesystem subscription.
    _handle: WatchHandle,
}

/// A scroll offset captured for one reload cycle.
///
/// Tagged with the token active at capture time so a restore belonging to a
/// superseded cycle can be discarded instead of landing on the wrong content.
struct PendingRestore {
    token: Token,
    offset: i64,
}

/// Keeps shown content fresh with minimal, debounced reloads, without losing
/// the reader's scroll position.
///
/// At most one watch is active at a time. Arming a new target tears the
/// previous watch down synchronously and replaces the session token before
/// any reload is dispatched, so residual notifications for the old token are
/// dropped at delivery time.
pub struct Reloader {
    surface: Arc<dyn Surface>,
    watcher: Arc<dyn FileWatch>,
    latency: Duration,
    fired_tx: mpsc::UnboundedSender<Fired>,
    active: Option<ActiveWatch>,
    state: ReloadState,
    pending: Option<PendingRestore>,
}

impl Reloader {
    /// Create a reloader and the channel on which its watch notifications
    /// arrive.
    ///
    /// The caller (normally the [`driver`](crate::driver)) owns the receiver
    /// and feeds each [`Fired`] back through [`handle_change`].
    ///
    /// [`handle_change`]: Self::handle_change
    #[must_use]
    pub fn new(
        surface: Arc<dyn Surface>,
        watcher: Arc<dyn FileWatch>,
        latency: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<Fired>) {
        let (fired_tx, fired_rx) = mpsc::unbounded_channel();
        let reloader = Self {
            surface,
            watcher,
            latency,
            fired_tx,
            active: None,
            state: ReloadState::Idle,
            pending: None,
        };
        (reloader, fired_rx)
    }

    /// Current position in the reload cycle.
    #[must_use]
    pub fn state(&self) -> ReloadState {
        self.state
    }

    /// Token of the active watch, if any.
    #[must_use]
    pub fn active_token(&self) -> Option<&Token> {
        self.active.as_ref().map(|a| &a.token)
    }

    /// Bind the surface to `target` under session `token`.
    ///
    /// A duplicate arm (same token as the active watch) is a no-op: upstream
    /// state sources may redeliver the same state. Otherwise any prior watch
    /// is released, the token is replaced, a watch goes up on
    /// `target.watch_path`, and an immediate reload of `target.resource` is
    /// dispatched.
    ///
    /// # Errors
    ///
    /// [`ReloadError::Watch`] if the watch cannot be established (the
    /// reloader is left disarmed). [`ReloadError::Load`] if the initial load
    /// cannot be issued (the watch stays armed).
    pub async fn arm(&mut self, target: WatchTarget, token: Token) -> Result<(), ReloadError> {
        if self.active.as_ref().is_some_and(|a| a.token == token) {
            tracing::debug!(%token, "duplicate arm ignored");
            return Ok(());
        }

        // Tear down before building up: the token is replaced first, so an
        // in-flight notification for the old watch misses at delivery time.
        self.disarm();

        let callback = self.change_callback(&token);
        let handle = self.watcher.watch(&target.watch_path, self.latency, callback)?;

        tracing::info!(%token, path = %target.watch_path.display(), "watch armed");
        self.active = Some(ActiveWatch {
            token,
            target,
            _handle: handle,
        });
        self.state = ReloadState::Armed;

        self.reload().await
    }

    /// Release the active watch and forget the session.
    ///
    /// Stray notifications arriving afterwards are dropped because no token
    /// matches them.
    pub fn disarm(&mut self) {
        if let Some(active) = self.active.take() {
            tracing::info!(token = %active.token, "watch disarmed");
        }
        self.pending = None;
        self.state = ReloadState::Idle;
    }

    /// Deliver a debounced watch notification.
    ///
    /// Dropped unless `fired.token` matches the active token - this is the
    /// cancellation point for notifications from a superseded or released
    /// watch.
    ///
    /// # Errors
    ///
    /// [`ReloadError::Load`] if the triggered reload cannot issue its load.
    pub async fn handle_change(&mut self, fired: Fired) -> Result<(), ReloadError> {
        let Some(active) = &self.active else {
            tracing::debug!(token = %fired.token, "change notification while disarmed, dropped");
            return Ok(());
        };
        if active.token != fired.token {
            tracing::debug!(
                stale = %fired.token,
                active = %active.token,
                "stale change notification dropped"
            );
            return Ok(());
        }

        tracing::debug!(token = %fired.token, kind = ?fired.kind, "external change detected");
        self.reload().await
    }

    /// Deliver a load-completion notification from the surface's transport.
    ///
    /// `cycle` is the token the transport observed on the content it finished
    /// loading, when it can report one; a completion tagged with a superseded
    /// token is ignored outright. An untagged completion (`None`) is assumed
    /// to belong to the pending cycle.
    ///
    /// The captured offset is restored at most once, and only while its tag
    /// still matches the active token.
    pub async fn handle_load_finished(&mut self, cycle: Option<Token>) {
        let completes_pending = match (&cycle, &self.pending) {
            (Some(token), Some(pending)) => *token == pending.token,
            (None, Some(_)) => true,
            _ => false,
        };
        if !completes_pending {
            tracing::debug!(?cycle, "load completion without matching cycle, ignored");
            return;
        }

        if self.state == ReloadState::ReloadInFlight {
            self.state = ReloadState::Armed;
        }

        let Some(restore) = self.pending.take() else {
            return;
        };
        if !self.active.as_ref().is_some_and(|a| a.token == restore.token) {
            tracing::debug!(token = %restore.token, "restore for superseded cycle discarded");
            return;
        }

        if let Err(err) = self.surface.apply_offset(restore.offset).await {
            tracing::debug!(%err, "scroll restore failed");
        }
    }

    /// Run one reload cycle: capture the scroll offset, then issue the load.
    ///
    /// The offset query may fail or suspend; failure falls back to offset
    /// zero. The captured offset is parked in a slot tagged with the current
    /// token until the load completes.
    async fn reload(&mut self) -> Result<(), ReloadError> {
        let Some(active) = &self.active else {
            return Ok(());
        };
        let token = active.token.clone();
        let resource = active.target.resource.clone();

        self.state = ReloadState::ReloadInFlight;

        let offset = match self.surface.query_offset().await {
            Ok(offset) => offset,
            Err(err) => {
                tracing::debug!(%err, "offset query failed, restoring to top");
                0
            }
        };
        self.pending = Some(PendingRestore {
            token: token.clone(),
            offset,
        });

        if let Err(err) = self.surface.load(&resource).await {
            // The watch survives; the next file change retries implicitly.
            self.pending = None;
            self.state = ReloadState::Armed;
            return Err(ReloadError::Load(err));
        }

        tracing::debug!(%token, resource = %resource, offset, "reload dispatched");
        Ok(())
    }

    /// Build the callback handed to the watch backend.
    ///
    /// The callback runs on the watcher's worker thread; it only stamps the
    /// notification with the arming token and queues it for the consumer.
    fn change_callback(&self, token: &Token) -> ChangeCallback {
        let fired_tx = self.fired_tx.clone();
        let token = token.clone();
        Box::new(move |kind| {
            let _ = fired_tx.send(Fired {
                token: token.clone(),
                kind,
            });
        })
    }
}
