//! Workload partitioning
//!
//! Splits the row-index space `[0, row_count)` into one contiguous,
//! half-open range per thread. The last range absorbs the remainder.

use std::fmt;
use std::ops::Range;

/// A contiguous slice of the row-index space owned by one task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRange {
    /// First row index (inclusive)
    pub start: usize,
    /// Last row index (exclusive)
    pub end: usize,
    /// Thread/task name, `<benchmark>-<start>`
    pub name: String,
}

impl TaskRange {
    pub fn new(start: usize, end: usize, benchmark: &str) -> Self {
        Self {
            start,
            end,
            name: format!("{}-{}", benchmark, start),
        }
    }

    /// Number of rows in this range
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn rows(&self) -> Range<usize> {
        self.start..self.end
    }
}

impl fmt::Display for TaskRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}, {})", self.name, self.start, self.end)
    }
}

/// Split `row_count` rows into `thread_count` contiguous ranges
///
/// `thread_count` must be at least 1; the config layer enforces it.
pub fn partition(row_count: usize, thread_count: usize) -> Vec<Range<usize>> {
    debug_assert!(thread_count >= 1, "thread count must be at least 1");

    let avg = row_count / thread_count;
    (0..thread_count)
        .map(|i| {
            let start = i * avg;
            let end = if i == thread_count - 1 {
                row_count
            } else {
                (i + 1) * avg
            };
            start..end
        })
        .collect()
}

/// Partition and name the ranges for one iteration
pub fn task_ranges(row_count: usize, thread_count: usize, benchmark: &str) -> Vec<TaskRange> {
    partition(row_count, thread_count)
        .into_iter()
        .map(|r| TaskRange::new(r.start, r.end, benchmark))
        .collect()
}
