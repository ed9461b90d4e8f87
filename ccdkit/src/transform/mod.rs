//! 90° rotation of image stacks.
//!
//! Every plane of an `N × M` (height × width) stack is rotated into an
//! `M × N` plane. The rotation is expressed as a gather table mapping each
//! destination index of a plane to its source index; the table depends only
//! on the plane shape and the sense, so it is built once per call and shared
//! by all planes.


use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::common::try_filled_vec;
use crate::error::Result;
use crate::stack::{ImageStack, Plane};

/// Direction of a 90° rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum RotationSense {
    /// `out[r][c] = in[N-1-c][r]`.
    Clockwise,
    /// `out[r][c] = in[c][M-1-r]`.
    CounterClockwise,
}

impl RotationSense {
    /// The sense that undoes this one.
    pub fn inverse(self) -> Self {
        match self {
            Self::Clockwise => Self::CounterClockwise,
            Self::CounterClockwise => Self::Clockwise,
        }
    }
}

/// `true` selects counter-clockwise, matching the integer flag used by array hosts.
impl From<bool> for RotationSense {
    fn from(counter_clockwise: bool) -> Self {
        if counter_clockwise {
            Self::CounterClockwise
        } else {
            Self::Clockwise
        }
    }
}

/// Destination → source index table for rotating one `height × width` plane.
///
/// Entry `i` of the result is the linear source index read by linear
/// destination index `i` of the `width × height` output plane.
pub fn rotation_map(height: usize, width: usize, sense: RotationSense) -> Result<Vec<usize>> {
    let mut map = try_filled_vec(height * width, 0usize, "rotation map")?;
    if map.is_empty() {
        return Ok(map);
    }

    // Output row `r` reads input column `r` (clockwise) or `width-1-r`.
    map.par_chunks_mut(height)
        .enumerate()
        .for_each(|(dst_row, row)| {
            let col = match sense {
                RotationSense::Clockwise => dst_row,
                RotationSense::CounterClockwise => width - 1 - dst_row,
            };
            for (dst_col, src) in row.iter_mut().enumerate() {
                let src_row = match sense {
                    RotationSense::Clockwise => height - 1 - dst_col,
                    RotationSense::CounterClockwise => dst_col,
                };
                *src = width * src_row + col;
            }
        });
    Ok(map)
}

/// Rotate every plane of `stack` by 90° in the given sense.
///
/// The returned stack has the trailing two dimensions swapped.
pub fn rotate90<T>(stack: &ImageStack<T>, sense: RotationSense) -> Result<ImageStack<T>>
where
    T: Copy + Default + Send + Sync,
{
    let (height, width) = (stack.height(), stack.width());
    let map = rotation_map(height, width, sense)?;

    tracing::debug!(
        "Rotating {} planes of {}x{} {}",
        stack.plane_count(),
        height,
        width,
        sense
    );

    let mut out = try_filled_vec(stack.len(), T::default(), "rotated stack")?;
    gather_planes(stack.as_slice(), &mut out, &map, height);

    ImageStack::with_shape(stack.shape().with_swapped_plane_axes(), out)
}

/// Rotate a single plane by 90°.
pub fn rotate90_plane<T>(plane: &Plane<T>, sense: RotationSense) -> Result<Plane<T>>
where
    T: Copy + Default + Send + Sync,
{
    let map = rotation_map(plane.height(), plane.width(), sense)?;
    let mut out = try_filled_vec(plane.len(), T::default(), "rotated plane")?;
    gather_planes(plane.pixels(), &mut out, &map, plane.height());
    Ok(Plane::from_parts(plane.width(), plane.height(), out))
}

/// Apply a per-plane gather table to every plane of `src`.
pub(crate) fn gather_planes<T>(src: &[T], dst: &mut [T], map: &[usize], row_len: usize)
where
    T: Copy + Send + Sync,
{
    let plane_len = map.len();
    remap_planes(dst, map, row_len, |plane, src_idx| {
        src[plane * plane_len + src_idx]
    });
}

/// Fill every plane of `dst` through a per-plane index table.
///
/// `f(plane, src_idx)` produces the value for the destination slot whose
/// table entry is `src_idx`. Output rows are `row_len` long and processed in
/// parallel; a row never straddles two planes because `row_len` divides the
/// plane length.
pub(crate) fn remap_planes<T, F>(dst: &mut [T], map: &[usize], row_len: usize, f: F)
where
    T: Send,
    F: Fn(usize, usize) -> T + Sync + Send,
{
    let plane_len = map.len();
    if plane_len == 0 || dst.is_empty() {
        return;
    }
    let rows_per_plane = plane_len / row_len;

    dst.par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(row_idx, row)| {
            let plane = row_idx / rows_per_plane;
            let map_start = (row_idx % rows_per_plane) * row_len;
            let map_row = &map[map_start..map_start + row_len];
            for (value, &src_idx) in row.iter_mut().zip(map_row) {
                *value = f(plane, src_idx);
            }
        });
}
