//! Overscan removal for FastCCD frames.
//!
//! The FastCCD reads out in super-columns laid along the second-to-last
//! axis: each super-column starts with `overscan_cols` virtual rows that see
//! only dark current, followed by `data_cols` rows of real pixels. The frame
//! is split at `width / 2` into two readout halves. The right half is read
//! top to bottom; the left half is read bottom to top, so its super-columns
//! are counted from the last row. Rows left over after the last complete
//! super-column of a half are discarded.
//!
//! [`drop_overscan`] keeps the data rows only. [`overscan_background`]
//! estimates the dark level of every data row from the overscan rows of its
//! super-column, and [`subtract_overscan`] does both in one pass.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::common::try_filled_vec;
use crate::error::{Error, Result};
use crate::stack::{ImageStack, StackShape};

/// Super-column geometry, counted along the second-to-last axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct OverscanLayout {
    pub overscan_cols: usize,
    pub data_cols: usize,
}

impl Default for OverscanLayout {
    /// Two overscan rows per ten data rows, the FastCCD timing default.
    fn default() -> Self {
        Self {
            overscan_cols: 2,
            data_cols: 10,
        }
    }
}

impl OverscanLayout {
    pub fn new(overscan_cols: usize, data_cols: usize) -> Self {
        Self {
            overscan_cols,
            data_cols,
        }
    }

    /// Rows per super-column.
    #[inline]
    pub fn super_col_len(&self) -> usize {
        self.overscan_cols + self.data_cols
    }

    /// Height of a raw frame whose data part is `data_height` rows tall.
    ///
    /// A 960-row frame with the default layout is read out as 1152 rows.
    pub fn readout_height(&self, data_height: usize) -> usize {
        data_height / self.data_cols.max(1) * self.super_col_len()
    }

    fn validate(&self) -> Result<()> {
        if self.overscan_cols == 0 || self.data_cols == 0 {
            return Err(Error::InvalidParameter {
                name: "overscan layout",
                reason: format!(
                    "overscan and data columns must both be non-zero, got {} and {}",
                    self.overscan_cols, self.data_cols
                ),
            });
        }
        Ok(())
    }
}

/// How the dark level of a super-column is taken from its overscan rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OverscanEstimate {
    /// Mean of all overscan rows.
    #[default]
    Mean,
    /// A single overscan row, in readout order of the left half. The right
    /// half uses the mirrored row so both halves sample the same position
    /// in their readout sequence.
    Column(usize),
}

/// Row bookkeeping for one frame geometry.
struct Readout {
    height: usize,
    width: usize,
    split: usize,
    out_height: usize,
    layout: OverscanLayout,
}

impl Readout {
    fn new(height: usize, width: usize, layout: OverscanLayout) -> Result<Self> {
        layout.validate()?;
        let groups = height / layout.super_col_len();
        if groups == 0 {
            return Err(Error::InvalidParameter {
                name: "overscan layout",
                reason: format!(
                    "frame height {height} is shorter than one super-column of {} rows",
                    layout.super_col_len()
                ),
            });
        }
        Ok(Self {
            height,
            width,
            split: width / 2,
            out_height: groups * layout.data_cols,
            layout,
        })
    }

    #[inline]
    fn is_left(&self, x: usize) -> bool {
        x < self.split
    }

    /// Super-column index and offset inside its data rows, in readout order.
    #[inline]
    fn locate(&self, row: usize, left: bool) -> (usize, usize) {
        let readout_row = if left { self.out_height - 1 - row } else { row };
        (
            readout_row / self.layout.data_cols,
            readout_row % self.layout.data_cols,
        )
    }

    /// Input row holding the `readout_row`-th row of a half in readout order.
    #[inline]
    fn input_row(&self, readout_row: usize, left: bool) -> usize {
        if left {
            self.height - 1 - readout_row
        } else {
            readout_row
        }
    }

    #[inline]
    fn data_row(&self, row: usize, left: bool) -> usize {
        let (group, offset) = self.locate(row, left);
        let readout_row = group * self.layout.super_col_len() + self.layout.overscan_cols + offset;
        self.input_row(readout_row, left)
    }

    #[inline]
    fn overscan_row(&self, group: usize, index: usize, left: bool) -> usize {
        self.input_row(group * self.layout.super_col_len() + index, left)
    }

    fn dark_level(
        &self,
        plane: &[f32],
        row: usize,
        x: usize,
        left: bool,
        estimate: OverscanEstimate,
    ) -> f32 {
        let (group, _) = self.locate(row, left);
        match estimate {
            OverscanEstimate::Mean => {
                let sum: f64 = (0..self.layout.overscan_cols)
                    .map(|j| plane[self.overscan_row(group, j, left) * self.width + x] as f64)
                    .sum();
                (sum / self.layout.overscan_cols as f64) as f32
            }
            OverscanEstimate::Column(n) => {
                let index = if left {
                    n
                } else {
                    self.layout.overscan_cols - 1 - n
                };
                plane[self.overscan_row(group, index, left) * self.width + x]
            }
        }
    }

    /// Build the output stack row by row; `f(plane, row, x, left)` gives one sample.
    fn remap<S, T, F>(&self, stack: &ImageStack<S>, what: &'static str, f: F) -> Result<ImageStack<T>>
    where
        S: Sync,
        T: Copy + Default + Send,
        F: Fn(&[S], usize, usize, bool) -> T + Sync,
    {
        let mut dims = stack.dims().to_vec();
        let ndims = dims.len();
        dims[ndims - 2] = self.out_height;
        let shape = StackShape::new(&dims)?;
        let mut out = try_filled_vec(shape.len(), T::default(), what)?;

        out.par_chunks_mut(self.width)
            .enumerate()
            .for_each(|(row_idx, out_row)| {
                let plane = stack.plane(row_idx / self.out_height);
                let row = row_idx % self.out_height;
                for (x, value) in out_row.iter_mut().enumerate() {
                    *value = f(plane, row, x, self.is_left(x));
                }
            });

        ImageStack::with_shape(shape, out)
    }
}

fn check_estimate(estimate: OverscanEstimate, layout: &OverscanLayout) -> Result<()> {
    match estimate {
        OverscanEstimate::Column(n) if n >= layout.overscan_cols => Err(Error::InvalidParameter {
            name: "overscan column",
            reason: format!("must be below {}, got {n}", layout.overscan_cols),
        }),
        _ => Ok(()),
    }
}

/// Remove the overscan rows of every super-column.
///
/// The output keeps all leading dimensions and the width; its height is the
/// number of complete super-columns times `data_cols`.
pub fn drop_overscan<T>(stack: &ImageStack<T>, layout: &OverscanLayout) -> Result<ImageStack<T>>
where
    T: Copy + Default + Send + Sync,
{
    let readout = Readout::new(stack.height(), stack.width(), *layout)?;
    tracing::debug!(
        "Dropping overscan from {} planes of {}x{}, {} data rows kept",
        stack.plane_count(),
        stack.height(),
        stack.width(),
        readout.out_height
    );
    readout.remap(stack, "overscan-free stack", |plane, row, x, left| {
        plane[readout.data_row(row, left) * readout.width + x]
    })
}

/// Dark level of every data pixel, shaped like the output of [`drop_overscan`].
pub fn overscan_background(
    stack: &ImageStack<f32>,
    layout: &OverscanLayout,
    estimate: OverscanEstimate,
) -> Result<ImageStack<f32>> {
    check_estimate(estimate, layout)?;
    let readout = Readout::new(stack.height(), stack.width(), *layout)?;
    readout.remap(stack, "overscan background", |plane, row, x, left| {
        readout.dark_level(plane, row, x, left, estimate)
    })
}

/// Drop the overscan rows and subtract their dark level from the data rows.
pub fn subtract_overscan(
    stack: &ImageStack<f32>,
    layout: &OverscanLayout,
    estimate: OverscanEstimate,
) -> Result<ImageStack<f32>> {
    check_estimate(estimate, layout)?;
    let readout = Readout::new(stack.height(), stack.width(), *layout)?;
    tracing::debug!(
        "Subtracting overscan ({:?}) from {} planes of {}x{}",
        estimate,
        stack.plane_count(),
        stack.height(),
        stack.width()
    );
    readout.remap(stack, "overscan-corrected stack", |plane, row, x, left| {
        plane[readout.data_row(row, left) * readout.width + x]
            - readout.dark_level(plane, row, x, left, estimate)
    })
}
