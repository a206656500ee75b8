//! # fpgastream benchmarks
//!
//! Criterion benchmarks for the FIFO core plus small transfer-rate
//! accounting helpers.

pub mod throughput;

pub use throughput::{TransferResult, run_transfer};
