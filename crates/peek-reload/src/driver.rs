//! Single-consumer driver for a [`Reloader`].
//!
//! Watch callbacks arrive on a worker thread and commands arrive from
//! arbitrary tasks; both are queued onto one consumer so all reloader state
//! is touched from a single context, in delivery order.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};

use crate::reloader::{ReloadState, Reloader, WatchTarget};
use crate::surface::Surface;
use crate::token::Token;
use crate::watch::FileWatch;

/// Commands accepted by the driver task.
enum Command {
    Arm { target: WatchTarget, token: Token },
    Disarm,
    LoadFinished { cycle: Option<Token> },
}

/// Cloneable handle to a running reloader driver.
///
/// Sends are fire-and-forget; failures (driver gone) are logged, not
/// surfaced, since they only happen during shutdown.
#[derive(Clone)]
pub struct ReloaderHandle {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ReloadState>,
}

impl ReloaderHandle {
    /// Request arming `target` under `token`.
    ///
    /// Duplicate tokens are ignored by the reloader, so upstream sources may
    /// redeliver the same state freely.
    pub fn arm(&self, target: WatchTarget, token: Token) {
        self.send(Command::Arm { target, token });
    }

    /// Request releasing the active watch.
    pub fn disarm(&self) {
        self.send(Command::Disarm);
    }

    /// Report that the surface finished loading content.
    ///
    /// `cycle` is the session token observed on the loaded content, when the
    /// transport can report one.
    pub fn load_finished(&self, cycle: Option<Token>) {
        self.send(Command::LoadFinished { cycle });
    }

    /// Current position in the reload cycle.
    #[must_use]
    pub fn state(&self) -> ReloadState {
        *self.state.borrow()
    }

    /// Subscribe to state transitions.
    ///
    /// Useful for status reporting and for tests awaiting a settled state.
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<ReloadState> {
        self.state.clone()
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            tracing::debug!("reloader driver is gone, command dropped");
        }
    }
}

/// Spawn the driver task and return a handle to it.
///
/// The task runs until every handle is dropped; the active watch (if any) is
/// released when the task ends.
#[must_use]
pub fn spawn(
    surface: Arc<dyn Surface>,
    watcher: Arc<dyn FileWatch>,
    latency: Duration,
) -> ReloaderHandle {
    let (command_tx, mut command_rx) = mpsc::unbounded_channel();
    let (state_tx, state_rx) = watch::channel(ReloadState::Idle);

    let (mut reloader, mut fired_rx) = Reloader::new(surface, watcher, latency);

    tokio::spawn(async move {
        loop {
            tokio::select! {
                command = command_rx.recv() => {
                    match command {
                        Some(Command::Arm { target, token }) => {
                            if let Err(err) = reloader.arm(target, token).await {
                                tracing::warn!(%err, "arm failed");
                            }
                        }
                        Some(Command::Disarm) => reloader.disarm(),
                        Some(Command::LoadFinished { cycle }) => {
                            reloader.handle_load_finished(cycle).await;
                        }
                        None => break,
                    }
                }
                Some(fired) = fired_rx.recv() => {
                    if let Err(err) = reloader.handle_change(fired).await {
                        tracing::warn!(%err, "reload failed");
                    }
                }
            }
            let _ = state_tx.send(reloader.state());
        }

        reloader.disarm();
        tracing::debug!("reloader driver stopped");
    });

    ReloaderHandle {
        commands: command_tx,
        state: state_rx,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockSurface, MockWatch};
    use crate::watch::ChangeKind;
    use pretty_assertions::assert_eq;

    /// Poll `check` until it passes or a generous deadline expires.
    async fn wait_for(check: impl Fn() -> bool) {
        for _ in 0..200 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached in time");
    }

    fn target(name: &str) -> WatchTarget {
        WatchTarget::new(format!("/content/{name}"), format!("/tmp/{name}.html"))
    }

    #[tokio::test]
    async fn test_arm_through_handle_loads_resource() {
        let surface = Arc::new(MockSurface::new());
        let watcher = Arc::new(MockWatch::new());
        let handle = spawn(
            Arc::clone(&surface) as Arc<dyn Surface>,
            Arc::clone(&watcher) as Arc<dyn FileWatch>,
            Duration::from_millis(10),
        );

        handle.arm(target("a"), Token::new());

        wait_for(|| surface.loads().len() == 1).await;
        assert_eq!(handle.state(), ReloadState::ReloadInFlight);
    }

    #[tokio::test]
    async fn test_watch_fire_round_trips_to_reload() {
        let surface = Arc::new(MockSurface::new());
        let watcher = Arc::new(MockWatch::new());
        let handle = spawn(
            Arc::clone(&surface) as Arc<dyn Surface>,
            Arc::clone(&watcher) as Arc<dyn FileWatch>,
            Duration::from_millis(10),
        );

        handle.arm(target("a"), Token::new());
        wait_for(|| surface.loads().len() == 1).await;

        watcher.fire(ChangeKind::Changed);
        wait_for(|| surface.loads().len() == 2).await;

        assert_eq!(
            surface.loads(),
            vec!["/content/a".to_owned(), "/content/a".to_owned()]
        );
    }

    #[tokio::test]
    async fn test_load_finished_settles_state_and_restores() {
        let surface = Arc::new(MockSurface::new().with_offset(55));
        let watcher = Arc::new(MockWatch::new());
        let handle = spawn(
            Arc::clone(&surface) as Arc<dyn Surface>,
            Arc::clone(&watcher) as Arc<dyn FileWatch>,
            Duration::from_millis(10),
        );

        handle.arm(target("a"), Token::new());
        wait_for(|| surface.loads().len() == 1).await;

        handle.load_finished(None);
        wait_for(|| handle.state() == ReloadState::Armed).await;

        assert_eq!(surface.applied(), vec![55]);
    }

    #[tokio::test]
    async fn test_disarm_through_handle_goes_idle() {
        let surface = Arc::new(MockSurface::new());
        let watcher = Arc::new(MockWatch::new());
        let handle = spawn(
            Arc::clone(&surface) as Arc<dyn Surface>,
            Arc::clone(&watcher) as Arc<dyn FileWatch>,
            Duration::from_millis(10),
        );

        handle.arm(target("a"), Token::new());
        wait_for(|| watcher.active_watches() == 1).await;

        handle.disarm();
        wait_for(|| handle.state() == ReloadState::Idle).await;
        assert_eq!(watcher.active_watches(), 0);
    }

    #[tokio::test]
    async fn test_rearm_scenario_drops_stale_notification() {
        let surface = Arc::new(MockSurface::new());
        let watcher = Arc::new(MockWatch::new());
        let handle = spawn(
            Arc::clone(&surface) as Arc<dyn Surface>,
            Arc::clone(&watcher) as Arc<dyn FileWatch>,
            Duration::from_millis(10),
        );

        handle.arm(target("a"), Token::new());
        wait_for(|| surface.loads().len() == 1).await;

        // Fire on A's watch, then immediately supersede with B. The fired
        // notification still carries A's token and must not reload B.
        watcher.fire(ChangeKind::Changed);
        handle.arm(target("b"), Token::new());

        wait_for(|| surface.loads().iter().any(|l| l == "/content/b")).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        let loads = surface.loads();
        assert_eq!(loads.iter().filter(|l| *l == "/content/b").count(), 1);
        assert!(loads.len() <= 3, "stale notification caused extra loads: {loads:?}");
        assert_eq!(watcher.active_watches(), 1);
        assert_eq!(watcher.last_path(), Some(std::path::PathBuf::from("/tmp/b.html")));
    }
}
