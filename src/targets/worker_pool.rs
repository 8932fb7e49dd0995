//! Background worker pool target
//!
//! Workers are started once in `init` and outlive every iteration, the way
//! an async server's event loops would. Ranges are queued to them during
//! DISPATCH, so the harness never starts a thread for these tasks. Each
//! worker owns a private shard, no locks on the hot path.

use std::collections::HashMap;
use std::hint::black_box;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{anyhow, Context};
use tracing::{debug, info};

use crate::benchmark::{Benchmark, PerfTask, TaskContext, TaskRange};

/// A range queued to a worker
struct Job {
    range: TaskRange,
    ctx: TaskContext,
    finished: Arc<AtomicBool>,
}

struct PoolWorker {
    sender: Sender<Job>,
    handle: JoinHandle<()>,
}

pub struct WorkerPoolBenchmark {
    /// Requested worker count (0 = one per harness thread)
    pool_size: usize,
    workers: Vec<PoolWorker>,
    /// Round-robin cursor for the next queued range
    next: usize,
}

impl WorkerPoolBenchmark {
    pub const NAME: &'static str = "WorkerPoolBenchmark";

    pub fn new(pool_size: usize) -> Self {
        Self {
            pool_size,
            workers: Vec::new(),
            next: 0,
        }
    }

    /// Number of running workers
    pub fn workers(&self) -> usize {
        self.workers.len()
    }
}

impl Benchmark for WorkerPoolBenchmark {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn init(&mut self, ctx: &TaskContext) -> anyhow::Result<()> {
        let size = if self.pool_size == 0 {
            ctx.config().thread_count
        } else {
            self.pool_size
        };

        for id in 0..size {
            let (sender, receiver) = mpsc::channel::<Job>();
            let handle = thread::Builder::new()
                .name(format!("pool-worker-{}", id))
                .spawn(move || {
                    let mut shard: HashMap<u32, u64> = HashMap::new();
                    while let Ok(job) = receiver.recv() {
                        process(&mut shard, &job);
                    }
                })
                .with_context(|| format!("spawning pool worker {}", id))?;
            self.workers.push(PoolWorker { sender, handle });
        }

        info!("Started {} pool workers", size);
        Ok(())
    }

    fn destroy(&mut self) -> anyhow::Result<()> {
        let mut panicked = 0;
        for worker in self.workers.drain(..) {
            drop(worker.sender);
            if worker.handle.join().is_err() {
                panicked += 1;
            }
        }
        if panicked > 0 {
            return Err(anyhow!("{} pool workers panicked", panicked));
        }
        Ok(())
    }

    fn create_task(
        &mut self,
        range: &TaskRange,
        ctx: &TaskContext,
    ) -> anyhow::Result<Arc<dyn PerfTask>> {
        if self.workers.is_empty() {
            return Err(anyhow!("worker pool is not running"));
        }

        let worker = &self.workers[self.next % self.workers.len()];
        self.next = self.next.wrapping_add(1);

        let finished = Arc::new(AtomicBool::new(false));
        worker
            .sender
            .send(Job {
                range: range.clone(),
                ctx: ctx.clone(),
                finished: Arc::clone(&finished),
            })
            .map_err(|_| anyhow!("pool worker for {} has exited", range.name))?;

        Ok(Arc::new(PoolTask {
            range: range.clone(),
            finished,
        }))
    }
}

fn process(shard: &mut HashMap<u32, u64>, job: &Job) {
    let ctx = &job.ctx;
    let write = ctx.config().is_write();

    ctx.mark_started();
    for idx in job.range.rows() {
        let key = ctx.key_for(idx);
        if write {
            shard.insert(key, idx as u64);
        } else {
            black_box(shard.get(&key).copied());
        }
        ctx.notify_operation_complete();
    }
    job.finished.store(true, Ordering::Release);
}

/// Handle for a range that a pool worker is processing
struct PoolTask {
    range: TaskRange,
    finished: Arc<AtomicBool>,
}

impl PerfTask for PoolTask {
    fn start_perf_test(&self) -> anyhow::Result<()> {
        Err(anyhow!(
            "{} is driven by the worker pool, not a harness thread",
            self.range.name
        ))
    }

    fn stop_perf_test(&self) -> anyhow::Result<()> {
        if !self.finished.load(Ordering::Acquire) {
            debug!("{} stopped before its worker marked it finished", self.range);
        }
        Ok(())
    }

    fn needs_own_thread(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmark::LoopCoordinator;
    use crate::config::BenchmarkConfig;

    fn config(threads: usize) -> BenchmarkConfig {
        BenchmarkConfig::new()
            .with_loops(3)
            .with_rows(3000)
            .with_threads(threads)
            .with_random(true)
            .with_write(true)
            .with_seed(5)
            .with_quiet(true)
    }

    #[test]
    fn test_pool_run() {
        let mut coordinator =
            LoopCoordinator::new(config(4), Box::new(WorkerPoolBenchmark::new(2))).unwrap();
        let results = coordinator.run().unwrap();

        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.benchmark == WorkerPoolBenchmark::NAME));
    }

    #[test]
    fn test_pool_size_defaults_to_threads() {
        let coordinator =
            LoopCoordinator::new(config(3), Box::new(WorkerPoolBenchmark::new(0))).unwrap();
        let ctx = coordinator.context();

        let mut pool = WorkerPoolBenchmark::new(0);
        pool.init(&ctx).unwrap();
        assert_eq!(pool.workers(), 3);
        pool.destroy().unwrap();
        assert_eq!(pool.workers(), 0);
    }

    #[test]
    fn test_create_before_init_fails() {
        let coordinator =
            LoopCoordinator::new(config(1), Box::new(WorkerPoolBenchmark::new(1))).unwrap();
        let ctx = coordinator.context();

        let mut pool = WorkerPoolBenchmark::new(1);
        let range = TaskRange::new(0, 10, WorkerPoolBenchmark::NAME);
        assert!(pool.create_task(&range, &ctx).is_err());
    }

    #[test]
    fn test_pool_task_is_background() {
        let task = PoolTask {
            range: TaskRange::new(0, 1, WorkerPoolBenchmark::NAME),
            finished: Arc::new(AtomicBool::new(false)),
        };
        assert!(!task.needs_own_thread());
        assert!(task.start_perf_test().is_err());
        assert!(task.stop_perf_test().is_ok());
    }
}
