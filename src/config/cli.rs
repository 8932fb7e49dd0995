//! Command-line argument parsing
//!
//! Arguments are grouped by category. Validation of argument combinations
//! lives in [`CliArgs::validate`]; resolution into an immutable run
//! configuration lives in [`super::BenchmarkConfig::from_cli`].

use clap::{Parser, ValueEnum};

/// Multi-threaded benchmark harness with built-in reference targets
#[derive(Parser, Debug, Clone)]
#[command(name = "perf-harness")]
#[command(version, about, long_about = None)]
pub struct CliArgs {
    // ===== Target =====
    /// Built-in benchmark target to drive
    #[arg(long = "target", value_enum, default_value_t = Target::Memory)]
    pub target: Target,

    /// Background workers for the pool target (0 = one per harness thread)
    #[arg(long = "pool-size", default_value_t = 0)]
    pub pool_size: usize,

    // ===== Benchmark Parameters =====
    /// Number of measured iterations
    #[arg(short = 'l', long = "loops", default_value_t = 5)]
    pub loops: u32,

    /// Total rows processed per iteration (split across threads)
    #[arg(short = 'n', long = "rows", default_value_t = 5000)]
    pub rows: usize,

    /// Number of worker threads (0 = available parallelism)
    #[arg(long = "threads", default_value_t = 0)]
    pub threads: usize,

    // ===== Access Pattern =====
    /// Visit rows in a seeded random order
    #[arg(long = "random", conflicts_with = "serial")]
    pub random: bool,

    /// Visit rows in index order
    #[arg(long = "serial")]
    pub serial: bool,

    /// Benchmark writes
    #[arg(long = "write", conflicts_with = "read")]
    pub write: bool,

    /// Benchmark reads (rows are loaded during init)
    #[arg(long = "read")]
    pub read: bool,

    /// Seed for the random key permutation (0 = random seed)
    #[arg(long = "seed", default_value_t = 0)]
    pub seed: u64,

    // ===== Output Options =====
    /// Result line format
    #[arg(long = "output-format", value_enum, default_value_t = OutputFormat::Text)]
    pub output_format: OutputFormat,

    /// Show a progress bar while waiting for each iteration
    #[arg(long = "progress")]
    pub progress: bool,

    /// Quiet mode (errors only in the log)
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,

    /// Verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Built-in benchmark target
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Target {
    /// Lock-protected in-memory map, one harness thread per range
    #[default]
    Memory,
    /// Background worker pool; ranges are handed to already-running workers
    Pool,
}

impl Target {
    pub fn as_str(&self) -> &'static str {
        match self {
            Target::Memory => "memory",
            Target::Pool => "pool",
        }
    }
}

/// Output format for per-iteration results
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl CliArgs {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate argument combinations
    pub fn validate(&self) -> Result<(), String> {
        if self.quiet && self.verbose {
            return Err("--quiet and --verbose are mutually exclusive".to_string());
        }

        if self.progress && self.output_format == OutputFormat::Json {
            return Err("--progress cannot be combined with --output-format json".to_string());
        }

        if self.pool_size > 0 && self.target != Target::Pool {
            return Err("--pool-size only applies to --target pool".to_string());
        }

        Ok(())
    }

    /// Get effective number of threads (0 = auto-detect)
    pub fn effective_threads(&self) -> usize {
        if self.threads == 0 {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
        } else {
            self.threads
        }
    }

    /// Tri-state access pattern: unset when neither flag is given
    pub fn access_pattern(&self) -> Option<bool> {
        match (self.random, self.serial) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }

    /// Tri-state operation kind: unset when neither flag is given
    pub fn operation(&self) -> Option<bool> {
        match (self.write, self.read) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}
