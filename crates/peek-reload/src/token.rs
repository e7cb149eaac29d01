//! Session markers for watch/reload cycles.

use std::fmt;

use uuid::Uuid;

/// Opaque token identifying one activation of the watch/reload cycle.
///
/// Tokens are compared by equality only. A fresh token is minted each time a
/// new resource is armed; a stale notification carrying an old token is
/// dropped at delivery time.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Token(Uuid);

impl Token {
    /// Mint a fresh token.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a token from its string form.
    ///
    /// Returns `None` for anything that is not a canonical UUID. Used by
    /// transports that echo the token back (e.g. a load-completion message).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl Default for Token {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
