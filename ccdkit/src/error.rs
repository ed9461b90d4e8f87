//! Error types shared by all kernels.

use thiserror::Error;

/// Errors reported by the ccdkit kernels.
///
/// Shape and parameter errors are raised before a kernel touches any data.
/// Allocation errors abort the call and drop whatever was already allocated.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Stack needs at least 2 dimensions, got {ndims}")]
    TooFewDimensions { ndims: usize },

    #[error("Stack dimensions {dims:?} have an empty plane axis")]
    EmptyPlane { dims: Vec<usize> },

    #[error("Stack dimensions {dims:?} describe more samples than fit in memory")]
    ShapeOverflow { dims: Vec<usize> },

    #[error("Buffer holds {actual} samples but dimensions {dims:?} need {expected}")]
    BufferLength {
        dims: Vec<usize>,
        expected: usize,
        actual: usize,
    },

    #[error("{what} is {actual_height}x{actual_width}, expected {expected_height}x{expected_width}")]
    ShapeMismatch {
        what: &'static str,
        expected_height: usize,
        expected_width: usize,
        actual_height: usize,
        actual_width: usize,
    },

    #[error("Background stack has {actual} planes, expected one per gain level (3)")]
    BackgroundPlaneCount { actual: usize },

    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Failed to allocate {len} elements for {what}")]
    Allocation { what: &'static str, len: usize },

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_few_dimensions_message() {
        let err = Error::TooFewDimensions { ndims: 1 };
        assert_eq!(err.to_string(), "Stack needs at least 2 dimensions, got 1");
    }

    #[test]
    fn test_shape_overflow_message() {
        let err = Error::ShapeOverflow {
            dims: vec![usize::MAX, 2, 2],
        };
        assert!(err.to_string().contains("more samples than fit in memory"));
    }

    #[test]
    fn test_buffer_length_message() {
        let err = Error::BufferLength {
            dims: vec![2, 3, 4],
            expected: 24,
            actual: 23,
        };
        let msg = err.to_string();
        assert!(msg.contains("[2, 3, 4]"));
        assert!(msg.contains("24"));
        assert!(msg.contains("23"));
    }

    #[test]
    fn test_shape_mismatch_message() {
        let err = Error::ShapeMismatch {
            what: "flat field",
            expected_height: 10,
            expected_width: 20,
            actual_height: 20,
            actual_width: 10,
        };
        assert_eq!(err.to_string(), "flat field is 20x10, expected 10x20");
    }

    #[test]
    fn test_invalid_parameter_message() {
        let err = Error::InvalidParameter {
            name: "sum_max",
            reason: "must be in 1..=9, got 0".to_string(),
        };
        assert!(err.to_string().contains("sum_max"));
        assert!(err.to_string().contains("got 0"));
    }

    #[test]
    fn test_allocation_message() {
        let err = Error::Allocation {
            what: "reduction accumulator",
            len: usize::MAX,
        };
        assert!(err.to_string().contains("reduction accumulator"));
    }

    #[test]
    fn test_error_is_debug() {
        let err = Error::BackgroundPlaneCount { actual: 2 };
        let debug_str = format!("{:?}", err);
        assert!(debug_str.contains("BackgroundPlaneCount"));
    }
}
