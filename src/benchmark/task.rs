//! Benchmark tasks
//!
//! A task owns one [`TaskRange`] for one iteration. Tasks that need their
//! own thread are started by the coordinator; the rest are driven by a
//! resource the benchmark already has running (a server, a worker pool)
//! and only have to report through their [`TaskContext`].
//!
//! Failures inside a task are logged here and never reach sibling tasks or
//! the coordinator. Note that a failing task does not decrement the pending
//! counter on its own; unless its error path still reports its remaining
//! rows, the iteration never completes.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, error};

use super::keys::RandomKeyPermutation;
use super::partition::TaskRange;
use super::tracker::CompletionTracker;
use crate::config::BenchmarkConfig;
use crate::utils::{HarnessError, Result};

/// One unit of benchmark work over a row range
///
/// Methods take `&self`: the coordinator may call `stop_perf_test` while
/// the task's thread is still returning from `start_perf_test`.
pub trait PerfTask: Send + Sync {
    /// Run the work. Must report each completed row through the context.
    fn start_perf_test(&self) -> anyhow::Result<()>;

    /// Release task-owned resources (TEARDOWN)
    fn stop_perf_test(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Whether the harness must start a dedicated thread for this task
    fn needs_own_thread(&self) -> bool {
        true
    }
}

/// What a task sees of the running harness
#[derive(Debug, Clone)]
pub struct TaskContext {
    config: Arc<BenchmarkConfig>,
    keys: Arc<RandomKeyPermutation>,
    tracker: CompletionTracker,
}

impl TaskContext {
    pub fn new(
        config: Arc<BenchmarkConfig>,
        keys: Arc<RandomKeyPermutation>,
        tracker: CompletionTracker,
    ) -> Self {
        Self {
            config,
            keys,
            tracker,
        }
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    pub fn keys(&self) -> &RandomKeyPermutation {
        &self.keys
    }

    pub fn tracker(&self) -> &CompletionTracker {
        &self.tracker
    }

    /// Key for row index `idx`: the permuted key in random mode, `idx + 1`
    /// otherwise, so both modes visit `[1..=row_count]`.
    #[inline]
    pub fn key_for(&self, idx: usize) -> u32 {
        if self.config.is_random() {
            self.keys.get(idx)
        } else {
            idx as u32 + 1
        }
    }

    /// First-writer-wins iteration start; background tasks call this
    /// themselves before their first row.
    #[inline]
    pub fn mark_started(&self) -> bool {
        self.tracker.mark_started()
    }

    #[inline]
    pub fn notify_operation_complete(&self) {
        self.tracker.notify_operation_complete();
    }

    #[inline]
    pub fn notify_operations_complete(&self, count: u32) {
        self.tracker.notify_operations_complete(count);
    }
}

/// A task together with the range it was created for
pub struct DispatchedTask {
    pub range: TaskRange,
    pub task: Arc<dyn PerfTask>,
}

impl DispatchedTask {
    pub fn new(range: TaskRange, task: Arc<dyn PerfTask>) -> Self {
        Self { range, task }
    }

    /// Run the task body on the current thread
    ///
    /// Marks the iteration start, then runs the body. Errors and panics are
    /// logged and swallowed.
    pub fn run(&self, tracker: &CompletionTracker) {
        tracker.mark_started();

        match panic::catch_unwind(AssertUnwindSafe(|| self.task.start_perf_test())) {
            Ok(Ok(())) => debug!("Task {} finished", self.range),
            Ok(Err(e)) => error!("Task {} failed: {:#}", self.range, e),
            Err(payload) => error!("Task {} panicked: {}", self.range, panic_message(&*payload)),
        }
    }

    /// Start a dedicated, detached thread named after the range
    pub fn spawn(&self, tracker: &CompletionTracker) -> Result<JoinHandle<()>> {
        let dispatched = DispatchedTask {
            range: self.range.clone(),
            task: Arc::clone(&self.task),
        };
        let tracker = tracker.clone();

        thread::Builder::new()
            .name(self.range.name.clone())
            .spawn(move || dispatched.run(&tracker))
            .map_err(|source| HarnessError::Spawn {
                name: self.range.name.clone(),
                source,
            })
    }

    /// Call `stop_perf_test`, logging any failure. Returns whether it succeeded.
    pub fn stop(&self) -> bool {
        match panic::catch_unwind(AssertUnwindSafe(|| self.task.stop_perf_test())) {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                error!("Task {} teardown failed: {:#}", self.range, e);
                false
            }
            Err(payload) => {
                error!(
                    "Task {} teardown panicked: {}",
                    self.range,
                    panic_message(&*payload)
                );
                false
            }
        }
    }
}

/// Stop every task independently (TEARDOWN). Returns the number that failed.
pub fn stop_all(tasks: &[DispatchedTask]) -> usize {
    tasks.iter().filter(|t| !t.stop()).count()
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingTask {
        rows: usize,
        ctx: TaskContext,
        fail_start: bool,
        fail_stop: bool,
        stopped: Arc<AtomicUsize>,
    }

    impl PerfTask for CountingTask {
        fn start_perf_test(&self) -> anyhow::Result<()> {
            for _ in 0..self.rows {
                self.ctx.notify_operation_complete();
            }
            if self.fail_start {
                anyhow::bail!("simulated failure after reporting rows");
            }
            Ok(())
        }

        fn stop_perf_test(&self) -> anyhow::Result<()> {
            self.stopped.fetch_add(1, Ordering::SeqCst);
            if self.fail_stop {
                anyhow::bail!("simulated teardown failure");
            }
            Ok(())
        }
    }

    struct PanickingTask;

    impl PerfTask for PanickingTask {
        fn start_perf_test(&self) -> anyhow::Result<()> {
            panic!("boom");
        }

        fn stop_perf_test(&self) -> anyhow::Result<()> {
            panic!("teardown boom");
        }
    }

    fn context(config: BenchmarkConfig) -> TaskContext {
        let keys = Arc::new(RandomKeyPermutation::new(config.row_count as u32, 3));
        TaskContext::new(Arc::new(config), keys, CompletionTracker::new())
    }

    fn counting(ctx: &TaskContext, rows: usize, fail_start: bool, fail_stop: bool) -> CountingTask {
        CountingTask {
            rows,
            ctx: ctx.clone(),
            fail_start,
            fail_stop,
            stopped: Arc::new(AtomicUsize::new(0)),
        }
    }

    #[test]
    fn test_key_for_serial_and_random() {
        let serial = context(BenchmarkConfig::new().with_rows(10).with_random(false));
        assert_eq!(serial.key_for(0), 1);
        assert_eq!(serial.key_for(9), 10);

        let random = context(BenchmarkConfig::new().with_rows(10).with_random(true));
        assert_eq!(random.key_for(4), random.keys().get(4));
    }

    #[test]
    fn test_run_marks_start_and_swallows_error() {
        let ctx = context(BenchmarkConfig::new().with_rows(5));
        let signal = ctx.tracker().reset(5);
        let task = DispatchedTask::new(
            TaskRange::new(0, 5, "Test"),
            Arc::new(counting(&ctx, 5, true, false)),
        );

        task.run(ctx.tracker());
        assert!(ctx.tracker().timing().is_started());
        assert!(signal.is_released());
    }

    #[test]
    fn test_run_swallows_panic() {
        let ctx = context(BenchmarkConfig::new().with_rows(1));
        ctx.tracker().reset(1);
        let task = DispatchedTask::new(TaskRange::new(0, 1, "Test"), Arc::new(PanickingTask));

        task.run(ctx.tracker());
        assert!(!task.stop());
        assert_eq!(ctx.tracker().pending(), 1);
    }

    #[test]
    fn test_spawn_uses_range_name() {
        let ctx = context(BenchmarkConfig::new().with_rows(3));
        let signal = ctx.tracker().reset(3);
        let task = DispatchedTask::new(
            TaskRange::new(0, 3, "Named"),
            Arc::new(counting(&ctx, 3, false, false)),
        );

        let handle = task.spawn(ctx.tracker()).unwrap();
        assert_eq!(handle.thread().name(), Some("Named-0"));
        assert!(signal.wait_timeout(Duration::from_secs(10)));
        handle.join().unwrap();
    }

    #[test]
    fn test_stop_all_continues_past_failures() {
        let ctx = context(BenchmarkConfig::new().with_rows(3));
        let stopped = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<DispatchedTask> = (0..3)
            .map(|i| {
                let mut t = counting(&ctx, 0, false, i == 0);
                t.stopped = Arc::clone(&stopped);
                DispatchedTask::new(TaskRange::new(i, i + 1, "Test"), Arc::new(t))
            })
            .chain(std::iter::once(DispatchedTask::new(
                TaskRange::new(3, 3, "Test"),
                Arc::new(PanickingTask),
            )))
            .collect();

        assert_eq!(stop_all(&tasks), 2);
        assert_eq!(stopped.load(Ordering::SeqCst), 3);
    }
}
