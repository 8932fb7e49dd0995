//! Iteration timestamps
//!
//! Start and end are monotonic nanosecond offsets from the recorder's
//! creation, stored in atomics so any worker can record them without a
//! lock. Zero is the "unset" sentinel; real readings are offset by one so
//! they can never collide with it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

const UNSET: u64 = 0;

/// Start/end timestamps for one iteration
#[derive(Debug)]
pub struct TimingRecorder {
    origin: Instant,
    start: AtomicU64,
    end: AtomicU64,
}

impl TimingRecorder {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            start: AtomicU64::new(UNSET),
            end: AtomicU64::new(UNSET),
        }
    }

    #[inline]
    fn now(&self) -> u64 {
        let nanos = u64::try_from(self.origin.elapsed().as_nanos()).unwrap_or(u64::MAX - 1);
        nanos + 1
    }

    /// Clear both timestamps (RESET)
    pub fn reset(&self) {
        self.start.store(UNSET, Ordering::SeqCst);
        self.end.store(UNSET, Ordering::SeqCst);
    }

    /// First-writer-wins start. Returns true for the single caller that set it.
    #[inline]
    pub fn mark_start(&self) -> bool {
        let now = self.now();
        self.start
            .compare_exchange(UNSET, now, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Record the end of the iteration.
    ///
    /// Plain store: when several decrements observe the counter at or below
    /// zero concurrently, the last of their stores is what remains.
    #[inline]
    pub fn mark_end(&self) {
        let now = self.now();
        self.end.store(now, Ordering::Release);
    }

    pub fn is_started(&self) -> bool {
        self.start.load(Ordering::Acquire) != UNSET
    }

    pub fn is_finished(&self) -> bool {
        self.end.load(Ordering::Acquire) != UNSET
    }

    /// Start offset from the recorder origin, if set
    pub fn start(&self) -> Option<Duration> {
        match self.start.load(Ordering::Acquire) {
            UNSET => None,
            t => Some(Duration::from_nanos(t - 1)),
        }
    }

    /// End offset from the recorder origin, if set
    pub fn end(&self) -> Option<Duration> {
        match self.end.load(Ordering::Acquire) {
            UNSET => None,
            t => Some(Duration::from_nanos(t - 1)),
        }
    }

    /// `end - start`, clamped at zero; None until both are set
    pub fn elapsed(&self) -> Option<Duration> {
        match (self.start(), self.end()) {
            (Some(start), Some(end)) => Some(end.saturating_sub(start)),
            _ => None,
        }
    }

    /// Total and per-thread average time in whole milliseconds
    pub fn totals_ms(&self, thread_count: usize) -> (u64, u64) {
        let total = self
            .elapsed()
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0);
        (total, average_ms(total, thread_count))
    }
}

impl Default for TimingRecorder {
    fn default() -> Self {
        Self::new()
    }
}

/// Integer average over the thread count
#[inline]
pub fn average_ms(total_ms: u64, thread_count: usize) -> u64 {
    total_ms / thread_count.max(1) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[test]
    fn test_unset_after_reset() {
        let timing = TimingRecorder::new();
        assert!(timing.mark_start());
        timing.mark_end();
        assert!(timing.elapsed().is_some());

        timing.reset();
        assert!(!timing.is_started());
        assert!(!timing.is_finished());
        assert_eq!(timing.elapsed(), None);
        assert_eq!(timing.totals_ms(4), (0, 0));
    }

    #[test]
    fn test_first_writer_wins() {
        let timing = TimingRecorder::new();
        assert!(timing.mark_start());
        let first = timing.start();

        thread::sleep(Duration::from_millis(2));
        assert!(!timing.mark_start());
        assert_eq!(timing.start(), first);
    }

    #[test]
    fn test_concurrent_start_has_one_winner() {
        for _ in 0..20 {
            let timing = Arc::new(TimingRecorder::new());
            let barrier = Arc::new(Barrier::new(8));

            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let t = Arc::clone(&timing);
                    let b = Arc::clone(&barrier);
                    thread::spawn(move || {
                        b.wait();
                        t.mark_start()
                    })
                })
                .collect();

            let winners = handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|won| *won)
                .count();
            assert_eq!(winners, 1);
        }
    }

    #[test]
    fn test_elapsed_is_end_minus_start() {
        let timing = TimingRecorder::new();
        timing.mark_start();
        thread::sleep(Duration::from_millis(5));
        timing.mark_end();

        let elapsed = timing.elapsed().unwrap();
        assert_eq!(elapsed, timing.end().unwrap() - timing.start().unwrap());
        assert!(elapsed >= Duration::from_millis(5));
    }

    #[test]
    fn test_end_before_start_clamps_to_zero() {
        let timing = TimingRecorder::new();
        timing.mark_end();
        thread::sleep(Duration::from_millis(1));
        timing.mark_start();
        assert_eq!(timing.elapsed(), Some(Duration::ZERO));
    }

    #[test]
    fn test_average_is_integer_division() {
        assert_eq!(average_ms(10, 4), 2);
        assert_eq!(average_ms(3, 4), 0);
        assert_eq!(average_ms(5000, 1), 5000);
    }
}
