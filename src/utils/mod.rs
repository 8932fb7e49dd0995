//! Utility modules

pub mod error;

pub use error::{HarnessError, Result};
