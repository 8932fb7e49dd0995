//! Shared per-run completion state
//!
//! The pending-operation counter and the iteration timestamps are the ONLY
//! synchronization points between tasks. Everything else a task touches is
//! its own. A cheap clone of [`CompletionTracker`] is handed to every task
//! so both harness-spawned threads and background resources can report
//! progress.
//!
//! ## End timestamp race
//!
//! The end time is stored by every decrement that leaves the counter at or
//! below zero. Two workers finishing together can both observe `<= 0` and
//! both store, so the recorded end is "about when the last operation
//! finished", not a strict bound.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::signal::CompletionSignal;
use super::timing::TimingRecorder;

#[derive(Debug)]
struct TrackerState {
    /// Units of work still outstanding in the current iteration
    pending: AtomicI64,
    timing: TimingRecorder,
    /// Signal for the current iteration, swapped on every reset
    signal: Mutex<Arc<CompletionSignal>>,
    /// Set by the first finisher so later ones skip the signal lock
    released: AtomicBool,
}

/// Pending-operation counter plus the current iteration's completion signal
#[derive(Debug, Clone)]
pub struct CompletionTracker {
    state: Arc<TrackerState>,
}

impl CompletionTracker {
    pub fn new() -> Self {
        Self {
            state: Arc::new(TrackerState {
                pending: AtomicI64::new(0),
                timing: TimingRecorder::new(),
                signal: Mutex::new(Arc::new(CompletionSignal::new())),
                released: AtomicBool::new(false),
            }),
        }
    }

    /// Start a new iteration (RESET)
    ///
    /// Clears both timestamps, arms the counter with `row_count` and installs
    /// a fresh signal, which is returned for the coordinator to wait on. With
    /// nothing to do the signal comes back already released.
    pub fn reset(&self, row_count: usize) -> Arc<CompletionSignal> {
        let signal = Arc::new(CompletionSignal::new());

        self.state.timing.reset();
        *self.state.signal.lock() = Arc::clone(&signal);
        self.state.released.store(row_count == 0, Ordering::SeqCst);
        self.state
            .pending
            .store(row_count as i64, Ordering::SeqCst);

        if row_count == 0 {
            signal.release();
        }
        signal
    }

    /// Record one completed unit of work
    #[inline]
    pub fn notify_operation_complete(&self) {
        self.notify_operations_complete(1);
    }

    /// Record `count` completed units in one atomic step
    ///
    /// Only the call that first takes the counter to zero touches the signal;
    /// every other call is lock-free.
    #[inline]
    pub fn notify_operations_complete(&self, count: u32) {
        if count == 0 {
            return;
        }
        let count = i64::from(count);
        let prev = self.state.pending.fetch_sub(count, Ordering::AcqRel);
        if prev.saturating_sub(count) <= 0 {
            self.state.timing.mark_end();
            if !self.state.released.swap(true, Ordering::AcqRel) {
                self.state.signal.lock().release();
            }
        }
    }

    /// First-writer-wins start of the iteration. Returns true for the winner.
    #[inline]
    pub fn mark_started(&self) -> bool {
        self.state.timing.mark_start()
    }

    /// Outstanding units of work (may dip below zero if a caller over-counts)
    pub fn pending(&self) -> i64 {
        self.state.pending.load(Ordering::Relaxed)
    }

    pub fn timing(&self) -> &TimingRecorder {
        &self.state.timing
    }

    /// Whether the current iteration's signal has been released
    pub fn is_complete(&self) -> bool {
        self.state.signal.lock().is_released()
    }
}

impl Default for CompletionTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_release_after_exact_count() {
        let tracker = CompletionTracker::new();
        let signal = tracker.reset(3);

        tracker.notify_operation_complete();
        tracker.notify_operation_complete();
        assert!(!signal.is_released());
        assert!(!tracker.timing().is_finished());

        tracker.notify_operation_complete();
        assert!(signal.is_released());
        assert!(tracker.timing().is_finished());
        assert_eq!(tracker.pending(), 0);
    }

    #[test]
    fn test_over_count_is_idempotent_for_signal() {
        let tracker = CompletionTracker::new();
        let signal = tracker.reset(1);

        tracker.notify_operation_complete();
        tracker.notify_operation_complete();
        assert!(signal.is_released());
        assert_eq!(tracker.pending(), -1);
    }

    #[test]
    fn test_batch_notify() {
        let tracker = CompletionTracker::new();
        let signal = tracker.reset(100);

        tracker.notify_operations_complete(60);
        assert!(!signal.is_released());
        tracker.notify_operations_complete(0);
        assert_eq!(tracker.pending(), 40);
        tracker.notify_operations_complete(40);
        assert!(signal.is_released());
    }

    #[test]
    fn test_reset_installs_fresh_signal() {
        let tracker = CompletionTracker::new();
        let first = tracker.reset(1);
        tracker.mark_started();
        tracker.notify_operation_complete();
        assert!(first.is_released());

        let second = tracker.reset(1);
        assert!(!second.is_released());
        assert!(!tracker.is_complete());
        assert!(!tracker.timing().is_started());
        assert!(!tracker.timing().is_finished());
        assert_eq!(tracker.pending(), 1);
    }

    #[test]
    fn test_zero_rows_released_immediately() {
        let tracker = CompletionTracker::new();
        let signal = tracker.reset(0);
        assert!(signal.is_released());
    }

    #[test]
    fn test_concurrent_workers_unblock_waiter() {
        let tracker = CompletionTracker::new();
        let rows = 5000usize;
        let signal = tracker.reset(rows);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let t = tracker.clone();
                thread::spawn(move || {
                    t.mark_started();
                    for _ in 0..rows / 4 {
                        t.notify_operation_complete();
                    }
                })
            })
            .collect();

        assert!(signal.wait_timeout(Duration::from_secs(10)));
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(tracker.pending(), 0);
        assert!(tracker.timing().elapsed().is_some());
    }

    #[test]
    fn test_over_count_after_release_skips_signal_lock() {
        let tracker = CompletionTracker::new();
        let signal = tracker.reset(1);
        tracker.notify_operation_complete();
        assert!(signal.is_released());

        let _slot = tracker.state.signal.lock();
        let (tx, rx) = mpsc::channel();
        let t = tracker.clone();
        let handle = thread::spawn(move || {
            t.notify_operation_complete();
            t.notify_operations_complete(3);
            tx.send(()).unwrap();
        });

        assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
        handle.join().unwrap();
        assert_eq!(tracker.pending(), -4);
    }

    #[test]
    fn test_large_counts_do_not_overflow() {
        let tracker = CompletionTracker::new();
        let signal = tracker.reset(1);

        tracker.notify_operations_complete(u32::MAX);
        assert!(signal.is_released());
        assert_eq!(tracker.pending(), 1 - i64::from(u32::MAX));

        tracker.state.pending.store(i64::MIN + 1, Ordering::SeqCst);
        tracker.notify_operations_complete(5);
        assert!(signal.is_released());
    }

    #[test]
    fn test_reset_rearms_release() {
        let tracker = CompletionTracker::new();
        tracker.reset(1);
        tracker.notify_operation_complete();

        let second = tracker.reset(2);
        tracker.notify_operations_complete(2);
        assert!(second.is_released());
    }
}
