//! Command-line interface for contract-analyzer.

mod commands;
pub mod icons;
pub mod progress;

pub use commands::{is_verbose, run};
