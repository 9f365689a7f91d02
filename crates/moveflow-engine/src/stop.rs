//! Cooperative cancellation checkpoints.
//!
//! The executor polls a `StopSignal` before starting each node. A node that is
//! already in flight always runs to completion; only the remainder of the
//! schedule is abandoned.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

pub trait StopSignal: Send + Sync + 'static {
    /// Ask the current run to stop at the next node boundary.
    fn request_stop(&self);

    fn is_stop_requested(&self) -> bool;

    /// Re-arm the signal for a fresh run.
    fn reset(&self);
}

/// Plain atomic flag.
#[derive(Default)]
pub struct StopFlag {
    requested: AtomicBool,
}

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StopSignal for StopFlag {
    fn request_stop(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    fn is_stop_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.requested.store(false, Ordering::SeqCst);
    }
}

/// Signal backed by a `CancellationToken`, so collaborators or sibling tasks
/// can observe the same cancellation. A token cannot be un-cancelled, so
/// `reset` swaps in a fresh one.
pub struct TokenStop {
    token: Mutex<CancellationToken>,
}

impl TokenStop {
    pub fn new() -> Self {
        Self {
            token: Mutex::new(CancellationToken::new()),
        }
    }

    /// Token for the current run.
    pub fn token(&self) -> CancellationToken {
        match self.token.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Default for TokenStop {
    fn default() -> Self {
        Self::new()
    }
}

impl StopSignal for TokenStop {
    fn request_stop(&self) {
        self.token().cancel();
    }

    fn is_stop_requested(&self) -> bool {
        self.token().is_cancelled()
    }

    fn reset(&self) {
        let mut guard = match self.token.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if guard.is_cancelled() {
            *guard = CancellationToken::new();
        }
    }
}

/// Cloneable handle for requesting a stop while a run holds the executor.
#[derive(Clone)]
pub struct StopHandle {
    signal: Arc<dyn StopSignal>,
}

impl StopHandle {
    pub fn new(signal: Arc<dyn StopSignal>) -> Self {
        Self { signal }
    }

    pub fn stop(&self) {
        self.signal.request_stop();
    }

    pub fn is_stop_requested(&self) -> bool {
        self.signal.is_stop_requested()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_request_and_reset() {
        let flag = StopFlag::new();
        assert!(!flag.is_stop_requested());
        flag.request_stop();
        assert!(flag.is_stop_requested());
        flag.reset();
        assert!(!flag.is_stop_requested());
    }

    #[test]
    fn test_token_reset_issues_fresh_token() {
        let stop = TokenStop::new();
        let first = stop.token();
        stop.request_stop();
        assert!(first.is_cancelled());
        assert!(stop.is_stop_requested());

        stop.reset();
        assert!(!stop.is_stop_requested());
        assert!(!stop.token().is_cancelled());
        // Earlier holders keep seeing the cancellation they observed.
        assert!(first.is_cancelled());
    }

    #[test]
    fn test_handle_shares_signal() {
        let signal: Arc<dyn StopSignal> = Arc::new(StopFlag::new());
        let handle = StopHandle::new(signal.clone());
        handle.clone().stop();
        assert!(signal.is_stop_requested());
        assert!(handle.is_stop_requested());
    }
}
