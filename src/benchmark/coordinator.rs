//! Benchmark loop coordinator
//!
//! Drives a [`Benchmark`] through `init`, then `loop_count` iterations of
//! RESET → DISPATCH → AWAIT → TEARDOWN → REPORT, then `destroy`.
//!
//! `destroy` runs exactly once whenever `init` succeeded, whether the loop
//! finished, returned an error or unwound from a panic.
//!
//! AWAIT has no timeout: an iteration ends only when the benchmark's tasks
//! have reported `row_count` completed rows between them.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::keys::RandomKeyPermutation;
use super::partition::{task_ranges, TaskRange};
use super::progress::ProgressReporter;
use super::task::{stop_all, DispatchedTask, PerfTask, TaskContext};
use super::tracker::CompletionTracker;
use crate::config::BenchmarkConfig;
use crate::metrics::{IterationResult, Reporter};
use crate::utils::{HarnessError, Result};

/// A benchmarked target
///
/// Implemented once per target system. The coordinator only ever sees the
/// trait object.
pub trait Benchmark: Send {
    /// Name used in result lines and thread names
    fn name(&self) -> &str;

    /// Called once before the first iteration
    fn init(&mut self, _ctx: &TaskContext) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called once after the last iteration
    fn destroy(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Build the task for one range of one iteration
    fn create_task(
        &mut self,
        range: &TaskRange,
        ctx: &TaskContext,
    ) -> anyhow::Result<Arc<dyn PerfTask>>;
}

/// Calls `destroy` exactly once, on `finish` or on drop
struct DestroyGuard<'a> {
    benchmark: &'a mut dyn Benchmark,
    destroyed: bool,
}

impl<'a> DestroyGuard<'a> {
    fn new(benchmark: &'a mut dyn Benchmark) -> Self {
        Self {
            benchmark,
            destroyed: false,
        }
    }

    fn benchmark(&mut self) -> &mut dyn Benchmark {
        &mut *self.benchmark
    }

    fn finish(mut self) -> anyhow::Result<()> {
        self.destroyed = true;
        self.benchmark.destroy()
    }
}

impl Drop for DestroyGuard<'_> {
    fn drop(&mut self) {
        if !self.destroyed {
            self.destroyed = true;
            if let Err(e) = self.benchmark.destroy() {
                error!("Benchmark {} destroy failed: {:#}", self.benchmark.name(), e);
            }
        }
    }
}

/// Runs the benchmark loop
pub struct LoopCoordinator {
    config: Arc<BenchmarkConfig>,
    benchmark: Box<dyn Benchmark>,
    keys: Arc<RandomKeyPermutation>,
    tracker: CompletionTracker,
    reporter: Reporter,
}

impl LoopCoordinator {
    /// Create a coordinator; the random key permutation is built here, once.
    pub fn new(config: BenchmarkConfig, benchmark: Box<dyn Benchmark>) -> Result<Self> {
        config.validate()?;

        let keys = RandomKeyPermutation::new(config.row_count as u32, config.seed);
        debug!(
            "Built key permutation of {} keys (seed {})",
            keys.len(),
            keys.seed()
        );

        let reporter = Reporter::new(config.output_format);

        Ok(Self {
            config: Arc::new(config),
            benchmark,
            keys: Arc::new(keys),
            tracker: CompletionTracker::new(),
            reporter,
        })
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    pub fn keys(&self) -> &RandomKeyPermutation {
        &self.keys
    }

    pub fn benchmark_name(&self) -> &str {
        self.benchmark.name()
    }

    /// The context handed to hooks and tasks
    pub fn context(&self) -> TaskContext {
        TaskContext::new(
            Arc::clone(&self.config),
            Arc::clone(&self.keys),
            self.tracker.clone(),
        )
    }

    /// Run `init`, every iteration, then `destroy`
    ///
    /// Returns one result per completed iteration. A DISPATCH failure stops
    /// the loop; its error is returned after `destroy` has run.
    pub fn run(&mut self) -> Result<Vec<IterationResult>> {
        let ctx = self.context();
        let name = self.benchmark.name().to_string();

        if !self.config.quiet {
            info!(
                "{}: {} loops, {} rows, {} threads",
                name, self.config.loop_count, self.config.row_count, self.config.thread_count
            );
        }

        self.benchmark.init(&ctx).map_err(HarnessError::Init)?;

        let runner = IterationRunner {
            config: &self.config,
            ctx: &ctx,
            tracker: &self.tracker,
            reporter: self.reporter,
        };
        let mut guard = DestroyGuard::new(&mut *self.benchmark);

        let mut results = Vec::with_capacity(self.config.loop_count as usize);
        let mut outcome = Ok(());
        for loop_index in 1..=self.config.loop_count {
            match runner.run_iteration(guard.benchmark(), loop_index) {
                Ok(result) => results.push(result),
                Err(e) => {
                    error!("{}: loop {} failed: {}", name, loop_index, e);
                    outcome = Err(e);
                    break;
                }
            }
        }

        let destroyed = guard.finish();
        match (outcome, destroyed) {
            (Ok(()), Ok(())) => Ok(results),
            (Ok(()), Err(e)) => Err(HarnessError::Destroy(e)),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(destroy_err)) => {
                error!("{}: destroy failed: {:#}", name, destroy_err);
                Err(e)
            }
        }
    }
}

/// Everything one iteration needs besides the benchmark itself
struct IterationRunner<'a> {
    config: &'a BenchmarkConfig,
    ctx: &'a TaskContext,
    tracker: &'a CompletionTracker,
    reporter: Reporter,
}

impl IterationRunner<'_> {
    fn run_iteration(
        &self,
        benchmark: &mut dyn Benchmark,
        loop_index: u32,
    ) -> Result<IterationResult> {
        let row_count = self.config.row_count;
        let thread_count = self.config.thread_count;

        // RESET
        debug!("loop {}: reset ({} rows pending)", loop_index, row_count);
        let signal = self.tracker.reset(row_count);

        // DISPATCH
        let tasks = self.dispatch(benchmark)?;

        // AWAIT
        debug!("loop {}: waiting for {} rows", loop_index, row_count);
        let progress = if self.config.progress {
            match ProgressReporter::spawn(
                self.tracker.clone(),
                Arc::clone(&signal),
                row_count as u64,
                format!("loop {}", loop_index),
            ) {
                Ok(p) => Some(p),
                Err(e) => {
                    warn!("Progress display unavailable: {}", e);
                    None
                }
            }
        } else {
            None
        };
        signal.wait();
        if let Some(progress) = progress {
            progress.finish();
        }

        // TEARDOWN
        let failed = stop_all(&tasks);
        if failed > 0 {
            warn!("loop {}: {} of {} tasks failed teardown", loop_index, failed, tasks.len());
        }

        // REPORT
        let timing = self.tracker.timing();
        if row_count > 0 && !timing.is_started() {
            warn!(
                "loop {}: no task recorded a start time; reporting 0 ms",
                loop_index
            );
        }
        let (total_time_ms, avg_time_ms) = timing.totals_ms(thread_count);
        let result = IterationResult::new(
            benchmark.name(),
            loop_index,
            self.config,
            total_time_ms,
            avg_time_ms,
        );
        self.reporter.report(&result);

        Ok(result)
    }

    /// Build one task per range, then start the ones that need a thread.
    /// On failure every task built so far is torn down.
    fn dispatch(&self, benchmark: &mut dyn Benchmark) -> Result<Vec<DispatchedTask>> {
        let ranges = task_ranges(
            self.config.row_count,
            self.config.thread_count,
            benchmark.name(),
        );

        let mut tasks = Vec::with_capacity(ranges.len());
        for range in ranges {
            match benchmark.create_task(&range, self.ctx) {
                Ok(task) => tasks.push(DispatchedTask::new(range, task)),
                Err(source) => {
                    stop_all(&tasks);
                    return Err(HarnessError::TaskCreation {
                        start: range.start,
                        end: range.end,
                        source,
                    });
                }
            }
        }

        for task in &tasks {
            if task.task.needs_own_thread() {
                if let Err(e) = task.spawn(self.tracker) {
                    stop_all(&tasks);
                    return Err(e);
                }
            } else {
                debug!("{} runs on a background resource", task.range);
            }
        }

        Ok(tasks)
    }
}
