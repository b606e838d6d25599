//! Throughput harness for sequence
//!
//! Runs the scanner, optionally followed by the known-pattern parser, over
//! an in-memory batch of lines and measures the throughput.
//!
//! # Module Structure
//!
//! - `types`: Configuration, mode and report types
//! - `worker`: Per-line work and the worker thread loop
//! - `processor`: Sequential and multi-worker orchestration

mod processor;
mod types;
mod worker;

// Re-export public types
pub use processor::{benchmark, BenchHarness};
pub use types::{BenchConfig, BenchMode, BenchReport};
