//! Error types for FIFO construction.

use thiserror::Error;

/// Error type for FIFO construction.
///
/// Once a FIFO pair exists, no operation on it can fail: blocking requests
/// terminate via zero-length leases after shutdown, never via errors.
#[derive(Debug, Error)]
pub enum FifoError {
    /// Requested capacity is unusable.
    #[error("invalid capacity: {capacity} bytes")]
    InvalidCapacity {
        /// Requested capacity in bytes.
        capacity: usize,
    },

    /// Write-side headroom would leave no writable space.
    #[error("invalid headroom: {headroom} bytes reserved out of {capacity} bytes capacity")]
    InvalidHeadroom {
        /// Requested headroom in bytes.
        headroom: usize,
        /// Requested capacity in bytes.
        capacity: usize,
    },

    /// The buffer memory could not be obtained.
    #[error("buffer allocation failed: {0}")]
    Allocation(#[from] std::io::Error),
}

/// Result type alias for FIFO construction.
pub type Result<T> = std::result::Result<T, FifoError>;
