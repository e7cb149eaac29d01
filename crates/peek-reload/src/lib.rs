//! Debounced external-change reload protocol.
//!
//! This crate keeps a presentation surface in sync with a file that is being
//! modified by an external program. It maintains a 1:1 binding between "the
//! resource currently shown" and "the path currently watched for changes",
//! coalesces bursts of filesystem events into single reloads, and preserves
//! the reader's scroll position across each reload.
//!
//! The moving parts:
//!
//! - [`Reloader`] - the coordination state machine (arm, disarm, reload)
//! - [`Surface`] - what the reloader drives (load content, query and apply
//!   scroll offsets)
//! - [`FileWatch`] / [`FsWatch`] - the filesystem watch capability with
//!   debounced delivery
//! - [`StateFeed`] - upstream state transitions that arm the reloader
//! - [`driver`] - a single-consumer task that serializes watch callbacks and
//!   commands onto one context
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use peek_reload::{FsWatch, Reloader, Token, WatchTarget};
//!
//! let surface: Arc<dyn peek_reload::Surface> = my_surface();
//! let watcher = Arc::new(FsWatch::new());
//! let handle = peek_reload::driver::spawn(surface, watcher, Duration::from_millis(1000));
//!
//! handle.arm(
//!     WatchTarget::new("/content?v=abc", "/tmp/page.html"),
//!     Token::new(),
//! );
//! ```

mod debounce;
pub mod driver;
mod feed;
mod fs;
pub mod mock;
mod reloader;
mod surface;
mod token;
mod watch;

pub use debounce::ChangeDebouncer;
pub use driver::ReloaderHandle;
pub use feed::{PreviewState, StateFeed, Subscription};
pub use fs::FsWatch;
pub use reloader::{Fired, ReloadError, ReloadState, Reloader, WatchTarget};
pub use surface::{Surface, SurfaceError};
pub use token::Token;
pub use watch::{ChangeCallback, ChangeKind, FileWatch, WatchError, WatchHandle};
