//! Parallel processing utilities and worker-pool configuration.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Selects the rayon pool a kernel call runs on.
///
/// `workers: None` runs on the ambient (global) pool. `Some(n)` builds a
/// dedicated pool with `n` threads for the duration of the call; `Some(0)`
/// is treated as a single worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    pub workers: Option<usize>,
}

impl ExecutionConfig {
    /// Run on whatever pool is current.
    pub fn ambient() -> Self {
        Self { workers: None }
    }

    /// Run on a dedicated pool of `workers` threads.
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers: Some(workers),
        }
    }

    /// Execute `op` inside the configured pool.
    pub fn install<R, F>(&self, op: F) -> Result<R>
    where
        R: Send,
        F: FnOnce() -> R + Send,
    {
        match self.workers {
            None => Ok(op()),
            Some(workers) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(workers.max(1))
                    .build()?;
                Ok(pool.install(op))
            }
        }
    }
}

/// Number of independent workers to split `units` of work across.
///
/// Never more than the number of units and never less than one.
#[inline]
pub fn worker_count(units: usize) -> usize {
    rayon::current_num_threads().min(units).max(1)
}

/// Split `0..total` into `parts` contiguous ranges whose lengths differ by at most one.
pub fn split_ranges(total: usize, parts: usize) -> Vec<Range<usize>> {
    let parts = parts.max(1);
    let base = total / parts;
    let extra = total % parts;

    let mut start = 0;
    (0..parts)
        .map(|part| {
            let len = base + usize::from(part < extra);
            let range = start..start + len;
            start += len;
            range
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_ranges_even() {
        let ranges = split_ranges(12, 3);
        assert_eq!(ranges, vec![0..4, 4..8, 8..12]);
    }

    #[test]
    fn test_split_ranges_uneven() {
        let ranges = split_ranges(10, 4);
        assert_eq!(ranges, vec![0..3, 3..6, 6..8, 8..10]);
    }

    #[test]
    fn test_split_ranges_more_parts_than_items() {
        let ranges = split_ranges(2, 4);
        assert_eq!(ranges, vec![0..1, 1..2, 2..2, 2..2]);
    }

    #[test]
    fn test_split_ranges_zero_parts_is_one() {
        assert_eq!(split_ranges(7, 0), vec![0..7]);
    }

    #[test]
    fn test_worker_count_bounds() {
        assert_eq!(worker_count(0), 1);
        assert_eq!(worker_count(1), 1);
        assert!(worker_count(1000) <= rayon::current_num_threads());
    }

    #[test]
    fn test_install_single_worker() {
        let threads = ExecutionConfig::with_workers(1)
            .install(rayon::current_num_threads)
            .unwrap();
        assert_eq!(threads, 1);
    }

    #[test]
    fn test_install_zero_workers_degrades_to_one() {
        let threads = ExecutionConfig::with_workers(0)
            .install(rayon::current_num_threads)
            .unwrap();
        assert_eq!(threads, 1);
    }

    #[test]
    fn test_install_ambient() {
        let value = ExecutionConfig::ambient().install(|| 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_execution_config_serde() {
        let config = ExecutionConfig::with_workers(4);
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(json, r#"{"workers":4}"#);
        let back: ExecutionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
