//! Error types for perf-harness

use std::io;
use thiserror::Error;

/// Top-level harness error
///
/// Task execution and teardown failures never surface here: they are
/// logged at task scope so one failing task cannot abort its siblings.
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Benchmark init failed: {0:#}")]
    Init(#[source] anyhow::Error),

    #[error("Benchmark destroy failed: {0:#}")]
    Destroy(#[source] anyhow::Error),

    #[error("Failed to create task for range [{start}, {end}): {source:#}")]
    TaskCreation {
        start: usize,
        end: usize,
        source: anyhow::Error,
    },

    #[error("Failed to spawn thread '{name}': {source}")]
    Spawn { name: String, source: io::Error },
}

pub type Result<T> = std::result::Result<T, HarnessError>;
