// ── Request staleness tracking ──
//
// Several polls of the same kind can be in flight at once, and they finish
// in any order. Each poll takes a token before it starts; when it finishes it
// only applies its result if no newer poll has started since. Nothing is
// cancelled -- stale results are simply dropped.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Ticket identifying one request in a stream of superseding requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Issues tokens for one logical request stream (e.g. task polling).
#[derive(Debug, Default)]
pub struct RequestTracker {
    latest: AtomicU64,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new request, superseding every earlier token.
    pub fn start_new_request(&self) -> RequestToken {
        RequestToken(self.latest.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Whether `token` is still the most recently issued one.
    pub fn is_latest(&self, token: RequestToken) -> bool {
        self.latest.load(Ordering::Acquire) == token.0
    }
}
