//! Session generation tracking.
//!
//! A turn captures a [`SessionToken`] before it awaits the model. If the host
//! loads a save (or otherwise resets the story) while the request is in
//! flight, it calls [`SessionClock::invalidate`]; the turn then sees a
//! different token on completion and discards its result.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque snapshot of the session generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionToken(u64);

/// Shared generation counter. Cloning shares the same counter.
#[derive(Debug, Clone, Default)]
pub struct SessionClock {
    generation: Arc<AtomicU64>,
}

impl SessionClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the current generation.
    pub fn token(&self) -> SessionToken {
        SessionToken(self.generation.load(Ordering::SeqCst))
    }

    /// Start a new generation; every outstanding token becomes stale.
    pub fn invalidate(&self) -> SessionToken {
        SessionToken(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Whether `token` still names the current generation.
    pub fn is_current(&self, token: SessionToken) -> bool {
        self.token() == token
    }
}
