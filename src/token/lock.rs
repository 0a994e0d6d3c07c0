//! Refresh Lock
//!
//! Pause flag that parks authorization checks while another execution
//! context performs a refresh.

use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative pause flag for refresh coordination.
///
/// Pausing does not abort anything in flight; it makes `ensure_authorized`
/// wait for the flag to drop (or for a valid token to appear) instead of
/// starting a competing refresh.
#[derive(Default)]
pub struct RefreshLock {
    paused: AtomicBool,
}

impl RefreshLock {
    /// Create new, unpaused lock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the pause flag.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    /// Drop the pause flag.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    /// Whether the flag is currently raised.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}
