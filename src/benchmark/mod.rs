//! Benchmark harness core
//!
//! This module provides the multi-threaded loop that drives a benchmark:
//! - partition: splits the rows into one range per thread
//! - task: the per-range unit of work and how it is started and stopped
//! - tracker: pending-operation counter and completion signal
//! - timing: first-writer-wins start and end timestamps
//! - coordinator: init, the measured loops, destroy

pub mod coordinator;
pub mod keys;
pub mod partition;
pub mod progress;
pub mod signal;
pub mod task;
pub mod timing;
pub mod tracker;

pub use coordinator::{Benchmark, LoopCoordinator};
pub use keys::RandomKeyPermutation;
pub use partition::{partition, task_ranges, TaskRange};
pub use signal::CompletionSignal;
pub use task::{PerfTask, TaskContext};
pub use timing::TimingRecorder;
pub use tracker::CompletionTracker;
