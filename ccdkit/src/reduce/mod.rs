//! NaN-aware per-pixel statistics across the planes of a stack.
//!
//! Planes are split into contiguous ranges, one per worker. Each worker owns
//! a private [`Accumulator`] holding per-pixel sum, sum of squares and count;
//! after the parallel phase the accumulators are merged sequentially and the
//! requested statistic is derived per pixel.
//!
//! # Normalization
//!
//! The variance is `(Σx² - (Σx)²/n) / n`, i.e. the population variance, and
//! the standard error divides its square root by `√n` once more. This
//! matches the long-standing behaviour of the detector pipeline and is kept
//! as is; it is not the unbiased sample variance.

mod accumulator;


use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

use accumulator::Accumulator;

use crate::common::parallel::{split_ranges, worker_count};
use crate::common::try_filled_vec;
use crate::error::Result;
use crate::stack::{ImageStack, Plane};

/// Statistic computed by [`reduce`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum Reduction {
    Sum,
    Mean,
    Variance,
    StdDev,
    /// Standard error of the mean.
    StdErr,
}

/// Per-pixel statistic and the number of non-NaN samples behind it.
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticsMaps {
    pub value: Plane<f32>,
    pub count: Plane<u64>,
}

/// Reduce `stack` along its plane axis.
///
/// NaN samples are skipped and do not count. Pixels without a single
/// contribution report value `0` and count `0` in every mode.
pub fn reduce(stack: &ImageStack<f32>, mode: Reduction) -> Result<StatisticsMaps> {
    let total = accumulate(stack.as_slice(), stack.plane_len())?;
    finalize(&total, mode, stack.height(), stack.width())
}

/// Per-pixel sum and count.
pub fn stack_sum(stack: &ImageStack<f32>) -> Result<StatisticsMaps> {
    reduce(stack, Reduction::Sum)
}

/// Per-pixel mean.
pub fn stack_mean(stack: &ImageStack<f32>) -> Result<Plane<f32>> {
    Ok(reduce(stack, Reduction::Mean)?.value)
}

/// Per-pixel variance and count.
pub fn stack_variance(stack: &ImageStack<f32>) -> Result<StatisticsMaps> {
    reduce(stack, Reduction::Variance)
}

/// Per-pixel standard deviation and count.
pub fn stack_std(stack: &ImageStack<f32>) -> Result<StatisticsMaps> {
    reduce(stack, Reduction::StdDev)
}

/// Per-pixel standard error of the mean and count.
pub fn stack_stderr(stack: &ImageStack<f32>) -> Result<StatisticsMaps> {
    reduce(stack, Reduction::StdErr)
}

/// Mean of all non-NaN samples of each entry along the leading axis.
///
/// A 2-D input is a single group. Groups without any finite sample
/// report `0`.
pub fn group_means(stack: &ImageStack<f32>) -> Result<Vec<f32>> {
    per_group(stack, |total| {
        let (sum, count) = total.grand_total();
        if count == 0 { 0.0 } else { (sum / count as f64) as f32 }
    })
}

/// Sum over pixels of each group's per-pixel mean plane.
pub fn group_sums(stack: &ImageStack<f32>) -> Result<Vec<f32>> {
    per_group(stack, |total| total.sum_of_means() as f32)
}

fn per_group<F>(stack: &ImageStack<f32>, f: F) -> Result<Vec<f32>>
where
    F: Fn(&Accumulator) -> f32,
{
    let dims = stack.dims();
    let groups = if dims.len() > 2 { dims[0] } else { 1 };
    if groups == 0 {
        return Ok(Vec::new());
    }
    let group_len = stack.len() / groups;
    if group_len == 0 {
        return Ok(vec![0.0; groups]);
    }

    stack
        .as_slice()
        .chunks_exact(group_len)
        .map(|group| accumulate(group, stack.plane_len()).map(|total| f(&total)))
        .collect()
}

/// Accumulate every `plane_len` chunk of `data` into a single accumulator.
fn accumulate(data: &[f32], plane_len: usize) -> Result<Accumulator> {
    let plane_count = data.len() / plane_len;
    let workers = worker_count(plane_count);

    tracing::debug!(
        "Accumulating {} planes of {} pixels across {} workers",
        plane_count,
        plane_len,
        workers
    );

    let partials = split_ranges(plane_count, workers)
        .into_par_iter()
        .map(|planes| -> Result<Accumulator> {
            let mut partial = Accumulator::new(plane_len)?;
            for plane in planes {
                partial.add_plane(&data[plane * plane_len..(plane + 1) * plane_len]);
            }
            Ok(partial)
        })
        .collect::<Result<Vec<_>>>()?;

    let mut partials = partials.into_iter();
    let mut total = match partials.next() {
        Some(first) => first,
        None => Accumulator::new(plane_len)?,
    };
    for partial in partials {
        total.merge(&partial);
    }
    Ok(total)
}

fn finalize(
    total: &Accumulator,
    mode: Reduction,
    height: usize,
    width: usize,
) -> Result<StatisticsMaps> {
    let mut value = try_filled_vec(total.len(), 0.0f32, "statistics value plane")?;
    let mut count = try_filled_vec(total.len(), 0u64, "statistics count plane")?;

    value
        .par_iter_mut()
        .zip(count.par_iter_mut())
        .enumerate()
        .for_each(|(i, (value, count))| {
            let n = total.count[i];
            if n == 0 {
                return;
            }
            *count = n;
            *value = statistic(mode, total.sum[i], total.sum_sq[i], n) as f32;
        });

    Ok(StatisticsMaps {
        value: Plane::from_parts(height, width, value),
        count: Plane::from_parts(height, width, count),
    })
}

#[inline]
fn statistic(mode: Reduction, sum: f64, sum_sq: f64, count: u64) -> f64 {
    let n = count as f64;
    match mode {
        Reduction::Sum => sum,
        Reduction::Mean => sum / n,
        Reduction::Variance => variance(sum, sum_sq, n),
        Reduction::StdDev => variance(sum, sum_sq, n).sqrt(),
        Reduction::StdErr => variance(sum, sum_sq, n).sqrt() / n.sqrt(),
    }
}

/// `(Σx² - (Σx)²/n) / n`, clamped at zero against cancellation.
#[inline]
fn variance(sum: f64, sum_sq: f64, n: f64) -> f64 {
    ((sum_sq - sum * sum / n) / n).max(0.0)
}
