//! Iteration results and reporting

pub mod reporter;
pub mod result;

pub use reporter::Reporter;
pub use result::{AccessPattern, IterationResult, Operation};
