//! Binary wake signal used to block and unblock one side of the FIFO.

use parking_lot::{Condvar, Mutex};

/// A binary (0/1) wake signal.
///
/// Unlike a counting semaphore, the pending-wake state saturates at one:
/// `raise` only posts when no wake is already pending. An extra raise is
/// therefore harmless, and waiters must re-check their wait condition
/// after waking because a raise may correspond to state that has already
/// been consumed.
pub(crate) struct WakeSignal {
    raised: Mutex<bool>,
    cond: Condvar,
}

impl WakeSignal {
    pub(crate) fn new() -> Self {
        Self {
            raised: Mutex::new(false),
            cond: Condvar::new(),
        }
    }

    /// Posts a wake if none is pending.
    pub(crate) fn raise(&self) {
        let mut raised = self.raised.lock();
        if !*raised {
            *raised = true;
            self.cond.notify_one();
        }
    }

    /// Blocks until a wake is pending, then consumes it.
    ///
    /// Spurious condvar wakeups are absorbed here; a stale wake (state
    /// already consumed by the time we run) is not, and is the caller's
    /// re-check loop to handle.
    pub(crate) fn wait(&self) {
        let mut raised = self.raised.lock();
        while !*raised {
            self.cond.wait(&mut raised);
        }
        *raised = false;
    }
}
