//! Single-photon event detection by 3×3 cluster analysis.
//!
//! Every interior pixel of every plane is tested independently:
//!
//! 1. the pixel must lie inside the threshold window,
//! 2. no 8-connected neighbour may be strictly brighter (ties are kept,
//!    and a NaN neighbour never counts as brighter),
//! 3. the `sum_max` brightest of the nine cluster values are summed and
//!    their spread computed; NaN values rank last,
//! 4. sum and spread must lie inside their filter windows.
//!
//! Pixels passing all tests receive the cluster sum and standard deviation;
//! everything else, including the one-pixel frame of each plane, receives
//! the configured no-data value.


use std::cmp::Ordering;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::common::try_filled_vec;
use crate::error::{Error, Result};
use crate::stack::ImageStack;

/// Number of pixels in a 3×3 cluster.
pub const CLUSTER_SIZE: usize = 9;

/// Half-open acceptance window `[lo, hi)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub lo: f32,
    pub hi: f32,
}

impl Window {
    pub fn new(lo: f32, hi: f32) -> Self {
        Self { lo, hi }
    }

    /// Accepts every finite value.
    pub fn unbounded() -> Self {
        Self {
            lo: f32::NEG_INFINITY,
            hi: f32::INFINITY,
        }
    }

    /// `lo <= value < hi`. NaN is never contained.
    #[inline]
    pub fn contains(&self, value: f32) -> bool {
        value >= self.lo && value < self.hi
    }

    fn validate(&self, name: &'static str) -> Result<()> {
        if self.lo.is_nan() || self.hi.is_nan() {
            return Err(Error::InvalidParameter {
                name,
                reason: format!("window bounds must not be NaN, got [{}, {})", self.lo, self.hi),
            });
        }
        Ok(())
    }
}

impl Default for Window {
    fn default() -> Self {
        Self::unbounded()
    }
}

/// Fill value for pixels without a photon event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum NoData {
    #[default]
    Zero,
    Nan,
}

impl NoData {
    #[inline]
    pub fn value(self) -> f32 {
        match self {
            Self::Zero => 0.0,
            Self::Nan => f32::NAN,
        }
    }
}

/// Photon counting parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhotonCountConfig {
    /// Window the center pixel must fall in.
    pub threshold: Window,
    /// Window the cluster sum must fall in.
    pub sum_filter: Window,
    /// Window the cluster standard deviation must fall in.
    pub std_filter: Window,
    /// Number of brightest cluster pixels to sum, `1..=9`.
    pub sum_max: usize,
    pub nodata: NoData,
}

impl Default for PhotonCountConfig {
    fn default() -> Self {
        Self {
            threshold: Window::unbounded(),
            sum_filter: Window::unbounded(),
            std_filter: Window::unbounded(),
            sum_max: 3,
            nodata: NoData::Zero,
        }
    }
}

impl PhotonCountConfig {
    /// Default filters with the given threshold window and cluster sum size.
    pub fn with_threshold(threshold: Window, sum_max: usize) -> Self {
        Self {
            threshold,
            sum_max,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=CLUSTER_SIZE).contains(&self.sum_max) {
            return Err(Error::InvalidParameter {
                name: "sum_max",
                reason: format!("must be in 1..={CLUSTER_SIZE}, got {}", self.sum_max),
            });
        }
        self.threshold.validate("threshold")?;
        self.sum_filter.validate("sum_filter")?;
        self.std_filter.validate("std_filter")?;
        Ok(())
    }
}

/// Cluster sum and standard deviation maps, shaped like the input stack.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMaps {
    pub sum: ImageStack<f32>,
    pub std: ImageStack<f32>,
}

/// Detect photon events in every plane of `stack`.
pub fn count_photons(stack: &ImageStack<f32>, config: &PhotonCountConfig) -> Result<FeatureMaps> {
    config.validate()?;

    let (height, width) = (stack.height(), stack.width());
    let nodata = config.nodata.value();

    let mut sum = try_filled_vec(stack.len(), nodata, "photon sum map")?;
    let mut std = try_filled_vec(stack.len(), nodata, "photon std map")?;

    tracing::debug!(
        "Counting photons in {} planes of {}x{}, sum_max={}",
        stack.plane_count(),
        height,
        width,
        config.sum_max
    );

    if height >= 3 && width >= 3 {
        let input = stack.as_slice();
        let plane_len = stack.plane_len();

        sum.par_chunks_mut(width)
            .zip(std.par_chunks_mut(width))
            .enumerate()
            .for_each(|(row_idx, (sum_row, std_row))| {
                let y = row_idx % height;
                if y == 0 || y == height - 1 {
                    return;
                }
                let plane_start = (row_idx / height) * plane_len;
                let plane = &input[plane_start..plane_start + plane_len];

                for x in 1..width - 1 {
                    if let Some((s, d)) = evaluate_pixel(plane, width, y, x, config) {
                        sum_row[x] = s;
                        std_row[x] = d;
                    }
                }
            });
    }

    let shape = stack.shape().clone();
    Ok(FeatureMaps {
        sum: ImageStack::with_shape(shape.clone(), sum)?,
        std: ImageStack::with_shape(shape, std)?,
    })
}

/// Cluster sum and standard deviation at interior pixel `(y, x)`, or `None`
/// if the pixel is rejected.
#[inline]
fn evaluate_pixel(
    plane: &[f32],
    width: usize,
    y: usize,
    x: usize,
    config: &PhotonCountConfig,
) -> Option<(f32, f32)> {
    let center = plane[y * width + x];
    if !config.threshold.contains(center) {
        return None;
    }

    let mut cluster = [0.0f32; CLUSTER_SIZE];
    let mut n = 0;
    for row in y - 1..=y + 1 {
        let start = row * width + x - 1;
        cluster[n..n + 3].copy_from_slice(&plane[start..start + 3]);
        n += 3;
    }

    if cluster.iter().any(|&v| v > center) {
        return None;
    }

    cluster.sort_unstable_by(descending_nan_last);

    let top = &cluster[..config.sum_max];
    let sum: f32 = top.iter().sum();
    let sum_sq: f32 = top.iter().map(|v| v * v).sum();

    if !config.sum_filter.contains(sum) {
        return None;
    }

    let n = config.sum_max as f32;
    let std = ((sum_sq - sum * sum / n) / n).max(0.0).sqrt();

    if !config.std_filter.contains(std) {
        return None;
    }

    Some((sum, std))
}

/// Brightest first. NaN ranks below every number, so it only reaches the
/// summed top values when fewer than `sum_max` cluster values are finite.
#[inline]
fn descending_nan_last(a: &f32, b: &f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (false, false) => b.total_cmp(a),
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
    }
}
