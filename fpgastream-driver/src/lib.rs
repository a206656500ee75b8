//! # fpgastream driver
//!
//! Xillybus-style stream device layer. A device exposes four named
//! streams (config, signal, read, write); this crate opens the two data
//! streams and bridges each to the application through one
//! [`fpgastream_fifo`] FIFO per direction, pumped by a dedicated
//! hardware-facing thread.
//!
//! This crate provides:
//! - [`StreamRole`] / [`StreamPaths`] - driver options for the four streams
//! - [`DeviceBuilder`] - configuration and open
//! - [`Device`] - `Read`/`Write` access plus ordered teardown

pub mod device;
pub mod error;
pub mod options;

pub use device::{Device, DeviceBuilder};
pub use error::DriverError;
pub use options::{DRIVER_NAME, StreamPaths, StreamRole};
