//! # fpgastream FIFO
//!
//! Blocking single-producer/single-consumer byte FIFO for hardware
//! streaming. One side is the hardware-facing I/O thread, the other the
//! application thread; the FIFO provides backpressure, zero-copy
//! windowed access, and graceful shutdown between them.
//!
//! This crate provides:
//! - [`Fifo`] / [`pair`] - construction of a writer/reader handle pair
//! - [`FifoWriter`] / [`FifoReader`] - the two sides, one handle each
//! - [`WriteLease`] / [`ReadLease`] - request/commit window protocol
//! - [`FifoStats`] - diagnostic byte counters
//!
//! ## Quick start
//!
//! ```
//! use fpgastream_fifo::pair;
//!
//! let (mut writer, mut reader) = pair(4096).unwrap();
//!
//! let mut lease = writer.request();
//! lease.as_mut_slice()[..5].copy_from_slice(b"hello");
//! lease.commit(5);
//!
//! let lease = reader.request();
//! assert_eq!(lease.as_slice(), b"hello");
//! lease.commit(5);
//! ```

pub mod error;
pub mod fifo;
mod signal;

pub use error::{FifoError, Result};
pub use fifo::{Fifo, FifoReader, FifoStats, FifoWriter, ReadLease, WriteLease, pair};
