//! Single-use completion signal
//!
//! A one-shot latch: released at most once, after which every current and
//! future waiter returns immediately. A fresh signal is allocated for every
//! iteration.

use std::time::Duration;

use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
pub struct CompletionSignal {
    released: Mutex<bool>,
    cond: Condvar,
}

impl CompletionSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Release all waiters. Returns true only for the call that released it.
    pub fn release(&self) -> bool {
        let mut released = self.released.lock();
        if *released {
            return false;
        }
        *released = true;
        self.cond.notify_all();
        true
    }

    pub fn is_released(&self) -> bool {
        *self.released.lock()
    }

    /// Block until released. No timeout.
    pub fn wait(&self) {
        let mut released = self.released.lock();
        while !*released {
            self.cond.wait(&mut released);
        }
    }

    /// Block until released or `timeout` elapses. Returns whether it was released.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut released = self.released.lock();
        if !*released {
            self.cond.wait_while_for(&mut released, |r| !*r, timeout);
        }
        *released
    }
}
