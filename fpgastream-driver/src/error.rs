//! Error types for driver operations.

use crate::options::StreamRole;
use fpgastream_fifo::FifoError;
use std::path::PathBuf;
use thiserror::Error;

/// Error type for driver operations.
#[derive(Debug, Error)]
pub enum DriverError {
    /// A named stream could not be opened.
    #[error("failed to open {role} stream at {path:?}: {source}")]
    Stream {
        /// Role of the stream that failed to open.
        role: StreamRole,
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// FIFO construction failed.
    #[error("FIFO error: {0}")]
    Fifo(#[from] FifoError),

    /// A pump thread could not be spawned.
    #[error("failed to spawn pump thread: {0}")]
    Spawn(std::io::Error),
}
