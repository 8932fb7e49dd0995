//! Progress display while the coordinator waits on an iteration
//!
//! Runs on its own thread and only reads the pending counter; it exits as
//! soon as the iteration's completion signal is released.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

use super::signal::CompletionSignal;
use super::tracker::CompletionTracker;
use crate::utils::{HarnessError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct ProgressReporter {
    handle: Option<JoinHandle<()>>,
}

impl ProgressReporter {
    /// Start drawing progress for one iteration of `total` rows
    pub fn spawn(
        tracker: CompletionTracker,
        signal: Arc<CompletionSignal>,
        total: u64,
        label: String,
    ) -> Result<Self> {
        let handle = thread::Builder::new()
            .name("perf-progress".to_string())
            .spawn(move || draw(&tracker, &signal, total, &label))
            .map_err(|source| HarnessError::Spawn {
                name: "perf-progress".to_string(),
                source,
            })?;

        Ok(Self {
            handle: Some(handle),
        })
    }

    /// Wait for the progress thread to clear its bar
    pub fn finish(mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Progress reporter thread panicked");
            }
        }
    }
}

/// Rows finished so far, derived from the pending counter
#[inline]
pub fn rows_finished(total: u64, pending: i64) -> u64 {
    total.saturating_sub(pending.max(0) as u64)
}

fn draw(tracker: &CompletionTracker, signal: &CompletionSignal, total: u64, label: &str) {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template(
            "{spinner:.green} {prefix} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({msg})",
        )
        .map(|s| s.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb.set_prefix(label.to_string());

    let mut last_finished = 0u64;
    let mut last_time = Instant::now();

    while !signal.wait_timeout(POLL_INTERVAL) {
        let finished = rows_finished(total, tracker.pending());
        pb.set_position(finished);

        let now = Instant::now();
        let interval = now.duration_since(last_time).as_secs_f64();
        if interval >= 0.5 {
            let rate = finished.saturating_sub(last_finished) as f64 / interval;
            pb.set_message(format!("{:.0} rows/s", rate));
            last_finished = finished;
            last_time = now;
        }
    }

    pb.finish_and_clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_finished() {
        assert_eq!(rows_finished(100, 100), 0);
        assert_eq!(rows_finished(100, 40), 60);
        assert_eq!(rows_finished(100, 0), 100);
        assert_eq!(rows_finished(100, -3), 100);
    }

    #[test]
    fn test_reporter_exits_on_release() {
        let tracker = CompletionTracker::new();
        let signal = tracker.reset(10);
        let reporter =
            ProgressReporter::spawn(tracker.clone(), Arc::clone(&signal), 10, "test".to_string())
                .unwrap();

        tracker.notify_operations_complete(10);
        reporter.finish();
        assert!(signal.is_released());
    }
}
