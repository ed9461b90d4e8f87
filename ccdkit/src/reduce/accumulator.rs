//! Per-worker running sums.

use crate::common::try_filled_vec;
use crate::error::Result;

/// Per-pixel running sum, sum of squares and count of non-NaN samples.
#[derive(Debug, Clone)]
pub(super) struct Accumulator {
    pub sum: Vec<f64>,
    pub sum_sq: Vec<f64>,
    pub count: Vec<u64>,
}

impl Accumulator {
    pub fn new(len: usize) -> Result<Self> {
        Ok(Self {
            sum: try_filled_vec(len, 0.0, "accumulator sum")?,
            sum_sq: try_filled_vec(len, 0.0, "accumulator sum of squares")?,
            count: try_filled_vec(len, 0, "accumulator count")?,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sum.len()
    }

    /// Add one plane, skipping NaN samples.
    pub fn add_plane(&mut self, plane: &[f32]) {
        debug_assert_eq!(plane.len(), self.len());
        for (i, &x) in plane.iter().enumerate() {
            if x.is_nan() {
                continue;
            }
            let x = x as f64;
            self.sum[i] += x;
            self.sum_sq[i] += x * x;
            self.count[i] += 1;
        }
    }

    /// Elementwise add another accumulator into this one.
    pub fn merge(&mut self, other: &Accumulator) {
        debug_assert_eq!(other.len(), self.len());
        for i in 0..self.len() {
            self.sum[i] += other.sum[i];
            self.sum_sq[i] += other.sum_sq[i];
            self.count[i] += other.count[i];
        }
    }

    /// Sum and count over all pixels.
    pub fn grand_total(&self) -> (f64, u64) {
        (self.sum.iter().sum(), self.count.iter().sum())
    }

    /// Sum over pixels of the per-pixel mean, skipping pixels without samples.
    pub fn sum_of_means(&self) -> f64 {
        self.sum
            .iter()
            .zip(&self.count)
            .filter(|&(_, &n)| n > 0)
            .map(|(&s, &n)| s / n as f64)
            .sum()
    }
}
