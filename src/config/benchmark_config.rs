//! Benchmark configuration derived from CLI arguments

use super::cli::{CliArgs, OutputFormat};
use crate::utils::{HarnessError, Result};

/// Default number of measured iterations
pub const DEFAULT_LOOP_COUNT: u32 = 5;

/// Default number of rows per iteration
pub const DEFAULT_ROW_COUNT: usize = 5000;

/// Complete benchmark configuration
///
/// Set before a run starts; the coordinator shares it read-only with every
/// task for the whole run.
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    // Workload
    pub loop_count: u32,
    pub row_count: usize,
    pub thread_count: usize,

    // Access pattern (None = unlabelled in the result line)
    pub is_random: Option<bool>,
    pub is_write: Option<bool>,
    pub seed: u64,

    // Output
    pub output_format: OutputFormat,
    pub progress: bool,
    pub quiet: bool,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            loop_count: DEFAULT_LOOP_COUNT,
            row_count: DEFAULT_ROW_COUNT,
            thread_count: default_thread_count(),
            is_random: None,
            is_write: None,
            seed: 0,
            output_format: OutputFormat::Text,
            progress: false,
            quiet: false,
        }
    }
}

impl BenchmarkConfig {
    /// Create a configuration with the default workload
    pub fn new() -> Self {
        Self::default()
    }

    /// Create configuration from CLI arguments
    pub fn from_cli(args: &CliArgs) -> std::result::Result<Self, String> {
        args.validate()?;

        let config = Self {
            loop_count: args.loops,
            row_count: args.rows,
            thread_count: args.effective_threads(),
            is_random: args.access_pattern(),
            is_write: args.operation(),
            seed: args.seed,
            output_format: args.output_format,
            progress: args.progress && !args.quiet,
            quiet: args.quiet,
        };
        config.validate().map_err(|e| e.to_string())?;

        Ok(config)
    }

    pub fn with_loops(mut self, loop_count: u32) -> Self {
        self.loop_count = loop_count;
        self
    }

    pub fn with_rows(mut self, row_count: usize) -> Self {
        self.row_count = row_count;
        self
    }

    pub fn with_threads(mut self, thread_count: usize) -> Self {
        self.thread_count = thread_count;
        self
    }

    pub fn with_random(mut self, is_random: bool) -> Self {
        self.is_random = Some(is_random);
        self
    }

    pub fn with_write(mut self, is_write: bool) -> Self {
        self.is_write = Some(is_write);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Check the preconditions the partitioner and counter rely on
    pub fn validate(&self) -> Result<()> {
        if self.thread_count == 0 {
            return Err(HarnessError::Config(
                "thread count must be at least 1".to_string(),
            ));
        }

        // keys are u32; this also keeps the pending counter within i64
        if u32::try_from(self.row_count).is_err() {
            return Err(HarnessError::Config(format!(
                "row count {} exceeds the key space (max {})",
                self.row_count,
                u32::MAX
            )));
        }

        Ok(())
    }

    /// Whether rows are visited through the random key permutation
    pub fn is_random(&self) -> bool {
        self.is_random.unwrap_or(false)
    }

    /// Whether the benchmark writes rows
    pub fn is_write(&self) -> bool {
        self.is_write.unwrap_or(false)
    }
}

fn default_thread_count() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(4)
}
