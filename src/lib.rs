//! contract-analyzer - contract PDF analysis through a hosted assistant.
//!
//! Uploads each document to the assistant service, waits for the analysis
//! run, and keeps the answer only if it passes a textual sanity check.

pub mod analysis;
pub mod assistant;
pub mod config;
