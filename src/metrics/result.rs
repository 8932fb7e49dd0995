//! Per-iteration benchmark result

use std::fmt;

use serde::Serialize;

use crate::config::BenchmarkConfig;

/// Order in which rows are visited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessPattern {
    Random,
    Serial,
}

impl AccessPattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessPattern::Random => "random",
            AccessPattern::Serial => "serial",
        }
    }
}

/// Kind of operation being measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Write,
    Read,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Write => "write",
            Operation::Read => "read",
        }
    }
}

/// Labels for the result line
///
/// Unlabelled when the access pattern is unset; an unset operation next to
/// a set pattern reads as a write.
pub fn labels(config: &BenchmarkConfig) -> (Option<AccessPattern>, Option<Operation>) {
    match config.is_random {
        None => (None, None),
        Some(random) => {
            let pattern = if random {
                AccessPattern::Random
            } else {
                AccessPattern::Serial
            };
            let operation = if config.is_write.unwrap_or(true) {
                Operation::Write
            } else {
                Operation::Read
            };
            (Some(pattern), Some(operation))
        }
    }
}

/// Timing of one measured iteration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IterationResult {
    pub benchmark: String,
    /// 1-based loop index
    #[serde(rename = "loop")]
    pub loop_index: u32,
    pub row_count: usize,
    pub thread_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_pattern: Option<AccessPattern>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<Operation>,
    pub total_time_ms: u64,
    pub avg_time_ms: u64,
}

impl IterationResult {
    pub fn new(
        benchmark: &str,
        loop_index: u32,
        config: &BenchmarkConfig,
        total_time_ms: u64,
        avg_time_ms: u64,
    ) -> Self {
        let (access_pattern, operation) = labels(config);
        Self {
            benchmark: benchmark.to_string(),
            loop_index,
            row_count: config.row_count,
            thread_count: config.thread_count,
            access_pattern,
            operation,
            total_time_ms,
            avg_time_ms,
        }
    }
}

impl fmt::Display for IterationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: loop: {}, row count: {}, thread count: {}",
            self.benchmark, self.loop_index, self.row_count, self.thread_count
        )?;
        if let Some(pattern) = self.access_pattern {
            write!(f, " {}", pattern.as_str())?;
        }
        if let Some(operation) = self.operation {
            write!(f, " {}", operation.as_str())?;
        }
        write!(
            f,
            ", total time: {} ms, avg time: {} ms",
            self.total_time_ms, self.avg_time_ms
        )
    }
}
