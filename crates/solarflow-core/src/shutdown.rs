// ── Shutdown gate ──
//
// Pairs the bridge-wide cancellation token with a lock, so that writes
// into shared state (cache commits, sink dispatch) either complete before
// shutdown clears that state or do not happen at all.

use std::sync::{PoisonError, RwLock};

use tokio_util::sync::CancellationToken;

/// Cancellation token plus a gate around state that shutdown clears.
///
/// [`run`](Self::run) holds the gate shared; [`close_with`](Self::close_with)
/// cancels the token and then takes it exclusively. Nothing passed to `run`
/// can start after `close_with` has returned, and `close_with` waits for
/// whatever was already running. Guards are never held across an `.await`.
#[derive(Debug, Default)]
pub struct ShutdownGate {
    token: CancellationToken,
    lock: RwLock<()>,
}

impl ShutdownGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_closed(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Run `f` unless shutdown has begun.
    pub fn run<T>(&self, f: impl FnOnce() -> T) -> Option<T> {
        let _open = self.lock.read().unwrap_or_else(PoisonError::into_inner);
        if self.token.is_cancelled() {
            return None;
        }
        Some(f())
    }

    /// Cancel the token, wait for running [`run`](Self::run) calls, then
    /// run `f` with the gate held exclusively.
    pub fn close_with(&self, f: impl FnOnce()) {
        self.token.cancel();
        let _closed = self.lock.write().unwrap_or_else(PoisonError::into_inner);
        f();
    }

    pub fn close(&self) {
        self.close_with(|| {});
    }
}
