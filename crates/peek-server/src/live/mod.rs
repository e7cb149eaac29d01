//! Live reload transport.
//!
//! Carries reload and scroll-preservation messages between the reloader and
//! connected browser shells over a WebSocket.

mod ws;

pub(crate) use ws::{WsSurface, ws_handler};
