//! Result reporter - one line per iteration on stdout
//!
//! Supports two formats:
//! - Text (the human-readable result line)
//! - JSON (one object per line)

use tracing::warn;

use super::result::IterationResult;
use crate::config::OutputFormat;

/// Writes iteration results to stdout
#[derive(Debug, Clone, Copy)]
pub struct Reporter {
    format: OutputFormat,
}

impl Reporter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Render a result in this reporter's format
    pub fn render(&self, result: &IterationResult) -> String {
        match self.format {
            OutputFormat::Text => result.to_string(),
            OutputFormat::Json => serde_json::to_string(result).unwrap_or_else(|e| {
                warn!("Failed to serialize result as JSON: {}", e);
                result.to_string()
            }),
        }
    }

    /// Print one result line
    pub fn report(&self, result: &IterationResult) {
        println!("{}", self.render(result));
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new(OutputFormat::Text)
    }
}
