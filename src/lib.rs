// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod cli;
pub mod config;
pub mod emit;
pub mod ingest;
pub mod merge;
pub mod observability;

#[cfg(test)]
mod test_log;

// ---- Re-exports for stable public API ----
pub use crate::ingest::types::{Impact, NormalizedEvent};
pub use crate::ingest::{run_batch, BatchReport};
