//! perf-harness library
//!
//! Multi-threaded benchmark harness: partitions a fixed row count across
//! worker threads, waits on an atomic completion counter, and reports
//! per-iteration timing for any target implementing [`Benchmark`].

pub mod benchmark;
pub mod config;
pub mod metrics;
pub mod targets;
pub mod utils;

pub use benchmark::{Benchmark, LoopCoordinator, PerfTask, TaskContext, TaskRange};
pub use config::BenchmarkConfig;
pub use metrics::IterationResult;
pub use utils::{HarnessError, Result};
