//! Image stack containers.
//!
//! An image stack is a contiguous buffer plus a shape descriptor. The last two
//! dimensions are `(height, width)` in row-major order; every dimension before
//! them is flattened into a plane count. This is the exchange format between
//! the kernels and whatever owns the arrays on the host side.

#[cfg(test)]
mod tests;

use std::ops::{Index, IndexMut};
use std::slice::ChunksExact;

use crate::common::try_filled_vec;
use crate::error::{Error, Result};

/// Validated shape descriptor of an image stack.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StackShape {
    dims: Vec<usize>,
    plane_count: usize,
    len: usize,
}

impl StackShape {
    /// Validate a shape descriptor.
    ///
    /// Requires at least two dimensions, a non-empty plane and a sample
    /// count that fits in `usize`. Leading dimensions may be zero, which
    /// describes a stack without planes.
    pub fn new(dims: &[usize]) -> Result<Self> {
        if dims.len() < 2 {
            return Err(Error::TooFewDimensions { ndims: dims.len() });
        }
        let ndims = dims.len();
        if dims[ndims - 2] == 0 || dims[ndims - 1] == 0 {
            return Err(Error::EmptyPlane {
                dims: dims.to_vec(),
            });
        }
        let overflow = || Error::ShapeOverflow {
            dims: dims.to_vec(),
        };
        let plane_len = dims[ndims - 2]
            .checked_mul(dims[ndims - 1])
            .ok_or_else(overflow)?;
        let plane_count = dims[..ndims - 2]
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or_else(overflow)?;
        let len = plane_count.checked_mul(plane_len).ok_or_else(overflow)?;

        Ok(Self {
            dims: dims.to_vec(),
            plane_count,
            len,
        })
    }

    /// Shape of a single `height × width` plane.
    pub fn plane(height: usize, width: usize) -> Result<Self> {
        Self::new(&[height, width])
    }

    #[inline]
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    #[inline]
    pub fn ndims(&self) -> usize {
        self.dims.len()
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.dims[self.dims.len() - 2]
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.dims[self.dims.len() - 1]
    }

    #[inline]
    pub fn plane_len(&self) -> usize {
        self.height() * self.width()
    }

    /// Product of all leading dimensions; 1 for a 2-D shape.
    #[inline]
    pub fn plane_count(&self) -> usize {
        self.plane_count
    }

    /// Total number of samples.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Same shape with the trailing two axes exchanged.
    pub fn with_swapped_plane_axes(&self) -> Self {
        let mut dims = self.dims.clone();
        let ndims = dims.len();
        dims.swap(ndims - 2, ndims - 1);
        Self {
            dims,
            plane_count: self.plane_count,
            len: self.len,
        }
    }
}

/// A stack of equally sized 2-D planes stored contiguously.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageStack<T> {
    shape: StackShape,
    data: Vec<T>,
}

impl<T> ImageStack<T> {
    /// Wrap `data` with the shape described by `dims`.
    pub fn new(dims: &[usize], data: Vec<T>) -> Result<Self> {
        let shape = StackShape::new(dims)?;
        Self::with_shape(shape, data)
    }

    /// Wrap `data` with an already validated shape.
    pub fn with_shape(shape: StackShape, data: Vec<T>) -> Result<Self> {
        if data.len() != shape.len() {
            return Err(Error::BufferLength {
                dims: shape.dims().to_vec(),
                expected: shape.len(),
                actual: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    #[inline]
    pub fn shape(&self) -> &StackShape {
        &self.shape
    }

    #[inline]
    pub fn dims(&self) -> &[usize] {
        self.shape.dims()
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.shape.height()
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.shape.width()
    }

    #[inline]
    pub fn plane_len(&self) -> usize {
        self.shape.plane_len()
    }

    #[inline]
    pub fn plane_count(&self) -> usize {
        self.shape.plane_count()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Samples of plane `index`.
    #[inline]
    pub fn plane(&self, index: usize) -> &[T] {
        let plane_len = self.plane_len();
        &self.data[index * plane_len..(index + 1) * plane_len]
    }

    /// Iterate over planes in storage order.
    #[inline]
    pub fn planes(&self) -> ChunksExact<'_, T> {
        self.data.chunks_exact(self.plane_len())
    }

    #[inline]
    pub fn get(&self, plane: usize, y: usize, x: usize) -> &T {
        debug_assert!(plane < self.plane_count() && y < self.height() && x < self.width());
        &self.data[plane * self.plane_len() + y * self.width() + x]
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    #[inline]
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Split into shape descriptor and buffer.
    #[inline]
    pub fn into_parts(self) -> (StackShape, Vec<T>) {
        (self.shape, self.data)
    }
}

impl<T: Clone> ImageStack<T> {
    /// Stack `planes` along a new leading axis.
    ///
    /// All planes must share the shape of the first one.
    pub fn from_planes(planes: &[Plane<T>]) -> Result<Self> {
        let Some(first) = planes.first() else {
            return Err(Error::InvalidParameter {
                name: "planes",
                reason: "at least one plane is required".to_string(),
            });
        };

        let shape = StackShape::new(&[planes.len(), first.height(), first.width()])?;
        let mut data = Vec::new();
        data.try_reserve_exact(shape.len())
            .map_err(|_| Error::Allocation {
                what: "stacked planes",
                len: shape.len(),
            })?;
        for plane in planes {
            first.check_same_shape(plane, "stacked plane")?;
            data.extend_from_slice(plane.pixels());
        }

        Self::with_shape(shape, data)
    }

    /// Copy plane `index` into a standalone [`Plane`].
    pub fn to_plane(&self, index: usize) -> Plane<T> {
        Plane {
            height: self.height(),
            width: self.width(),
            pixels: self.plane(index).to_vec(),
        }
    }
}

/// A single `height × width` row-major plane.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane<T> {
    height: usize,
    width: usize,
    pixels: Vec<T>,
}

impl<T> Plane<T> {
    pub fn new(height: usize, width: usize, pixels: Vec<T>) -> Result<Self> {
        let shape = StackShape::plane(height, width)?;
        if pixels.len() != shape.len() {
            return Err(Error::BufferLength {
                dims: vec![height, width],
                expected: shape.len(),
                actual: pixels.len(),
            });
        }
        Ok(Self {
            height,
            width,
            pixels,
        })
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    #[inline]
    pub fn get(&self, y: usize, x: usize) -> &T {
        debug_assert!(x < self.width && y < self.height);
        &self.pixels[y * self.width + x]
    }

    #[inline]
    pub fn pixels(&self) -> &[T] {
        &self.pixels
    }

    #[inline]
    pub fn into_vec(self) -> Vec<T> {
        self.pixels
    }

    /// View as a one-plane stack with dimensions `[height, width]`.
    pub fn into_stack(self) -> ImageStack<T> {
        let len = self.pixels.len();
        ImageStack {
            shape: StackShape {
                dims: vec![self.height, self.width],
                plane_count: 1,
                len,
            },
            data: self.pixels,
        }
    }

    /// Error unless `other` has the same height and width as `self`.
    pub(crate) fn check_same_shape<U>(&self, other: &Plane<U>, what: &'static str) -> Result<()> {
        check_plane_shape(what, self.height, self.width, other.height, other.width)
    }

    /// Build a plane from a buffer whose length is already known to match.
    pub(crate) fn from_parts(height: usize, width: usize, pixels: Vec<T>) -> Self {
        debug_assert_eq!(pixels.len(), height * width);
        Self {
            height,
            width,
            pixels,
        }
    }
}

impl<T: Clone> Plane<T> {
    pub fn filled(height: usize, width: usize, value: T) -> Result<Self> {
        let shape = StackShape::plane(height, width)?;
        Ok(Self {
            height,
            width,
            pixels: try_filled_vec(shape.len(), value, "plane")?,
        })
    }
}

impl<T> Index<(usize, usize)> for Plane<T> {
    type Output = T;

    /// Index by `(y, x)`.
    #[inline]
    fn index(&self, (y, x): (usize, usize)) -> &Self::Output {
        &self.pixels[y * self.width + x]
    }
}

impl<T> IndexMut<(usize, usize)> for Plane<T> {
    #[inline]
    fn index_mut(&mut self, (y, x): (usize, usize)) -> &mut Self::Output {
        &mut self.pixels[y * self.width + x]
    }
}

/// Compare a plane's spatial shape against the expected one.
pub(crate) fn check_plane_shape(
    what: &'static str,
    expected_height: usize,
    expected_width: usize,
    actual_height: usize,
    actual_width: usize,
) -> Result<()> {
    if expected_height != actual_height || expected_width != actual_width {
        return Err(Error::ShapeMismatch {
            what,
            expected_height,
            expected_width,
            actual_height,
            actual_width,
        });
    }
    Ok(())
}
