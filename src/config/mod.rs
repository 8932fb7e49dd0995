//! Configuration module

pub mod benchmark_config;
pub mod cli;

pub use benchmark_config::BenchmarkConfig;
pub use cli::{CliArgs, OutputFormat, Target};
