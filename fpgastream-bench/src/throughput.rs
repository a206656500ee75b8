//! Transfer-rate accounting.

use std::time::{Duration, Instant};

/// Result of a timed byte transfer.
#[derive(Debug, Clone)]
pub struct TransferResult {
    /// Total bytes moved.
    pub bytes: u64,
    /// Total duration.
    pub duration: Duration,
}

impl TransferResult {
    /// Returns bytes per second.
    #[must_use]
    pub fn bytes_per_second(&self) -> f64 {
        self.bytes as f64 / self.duration.as_secs_f64()
    }

    /// Returns mebibytes per second.
    #[must_use]
    pub fn mib_per_second(&self) -> f64 {
        self.bytes_per_second() / (1024.0 * 1024.0)
    }
}

/// Times `steps` invocations of `step_fn`, each moving `bytes_per_step`.
pub fn run_transfer<F>(bytes_per_step: usize, steps: u64, mut step_fn: F) -> TransferResult
where
    F: FnMut(),
{
    let start = Instant::now();

    for _ in 0..steps {
        step_fn();
    }

    TransferResult {
        bytes: steps * bytes_per_step as u64,
        duration: start.elapsed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_result_rates() {
        let result = TransferResult {
            bytes: 2 * 1024 * 1024,
            duration: Duration::from_secs(2),
        };
        assert!((result.bytes_per_second() - 1024.0 * 1024.0).abs() < f64::EPSILON);
        assert!((result.mib_per_second() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_run_transfer_counts_all_steps() {
        let mut calls = 0u64;
        let result = run_transfer(128, 10, || calls += 1);
        assert_eq!(calls, 10);
        assert_eq!(result.bytes, 1280);
    }
}
