//! Built-in reference benchmarks
//!
//! Small in-process targets for exercising the harness from the command
//! line: one thread-per-task target and one background-pool target.

pub mod memory_map;
pub mod worker_pool;

pub use memory_map::MemoryMapBenchmark;
pub use worker_pool::WorkerPoolBenchmark;

use crate::benchmark::Benchmark;
use crate::config::Target;

/// Build the benchmark for a CLI target
pub fn create_benchmark(target: Target, pool_size: usize) -> Box<dyn Benchmark> {
    match target {
        Target::Memory => Box::new(MemoryMapBenchmark::new()),
        Target::Pool => Box::new(WorkerPoolBenchmark::new(pool_size)),
    }
}
