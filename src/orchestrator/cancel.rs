// Sun Feb 22 2026 - Alex

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared stop signal for the poll loop. Cancelling never interrupts a read in
/// flight; the loop notices at its next wait.
#[derive(Clone, Default)]
pub struct CancellationToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let (cancelled, signal) = &*self.inner;
        *cancelled.lock() = true;
        signal.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.0.lock()
    }

    /// Sleep for `duration` or until cancelled. Returns `true` if cancelled.
    pub fn wait(&self, duration: Duration) -> bool {
        let (cancelled, signal) = &*self.inner;
        let deadline = Instant::now() + duration;
        let mut guard = cancelled.lock();
        while !*guard {
            if signal.wait_until(&mut guard, deadline).timed_out() {
                break;
            }
        }
        *guard
    }
}
