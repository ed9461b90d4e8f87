//! Testing utilities for ccdkit.

#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::ImageStack;

/// Initialize tracing subscriber for tests.
/// Safe to call multiple times; respects RUST_LOG and defaults to "debug"
/// so kernel partitioning shows up in failing test output.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Relative comparison, absolute below magnitude 1.
#[track_caller]
pub fn assert_close(actual: f32, expected: f32, tolerance: f32) {
    assert!(
        (actual - expected).abs() <= tolerance * expected.abs().max(1.0),
        "expected {expected}, got {actual}"
    );
}

/// Stack of uniform samples in `range`, reproducible per `seed`.
pub fn random_stack(dims: &[usize], range: std::ops::Range<f32>, seed: u64) -> ImageStack<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    let len: usize = dims.iter().product();
    let data = (0..len).map(|_| rng.random_range(range.clone())).collect();
    ImageStack::new(dims, data).unwrap()
}
