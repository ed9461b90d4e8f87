//! ccdkit - Correction and feature extraction kernels for CCD area detectors.
//!
//! This library turns raw detector frames into corrected intensity maps and
//! derived products:
//! - Background, flat-field and gain correction of encoded samples
//! - FastCCD overscan removal and ADU to photon conversion
//! - 90° rotation of image stacks
//! - NaN-aware per-pixel statistics across a stack
//! - Single-photon event detection by 3×3 cluster analysis
//!
//! All kernels take an [`ImageStack`]: a contiguous buffer whose last two
//! dimensions are `(height, width)`, with every leading dimension flattened
//! into a plane count. Kernels never mutate their inputs and return freshly
//! allocated outputs. Work is spread over the current rayon pool; use
//! [`ExecutionConfig`] to pin a call to a dedicated pool.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use ccdkit::prelude::*;
//!
//! let raw = ImageStack::new(&[100, 960, 960], samples)?;
//! let corrected = FastCcdCorrector::new(Some(darks), Some(flat), GainCoefficients::default())
//!     .correct(&raw)?;
//!
//! let mean = stack_mean(&corrected)?;
//! let photons = count_photons(&corrected, &PhotonCountConfig::default())?;
//! ```

pub(crate) mod common;
pub mod correction;
mod error;
pub mod photon_count;
pub mod reduce;
pub mod stack;
pub mod transform;

#[cfg(test)]
pub(crate) mod testing;

pub mod prelude;

// ============================================================================
// Core types
// ============================================================================

pub use common::parallel::ExecutionConfig;
pub use error::{Error, Result};
pub use stack::{ImageStack, Plane, StackShape};

// ============================================================================
// Correction
// ============================================================================

pub use correction::{
    Axis1Corrector, DecodedSample, FastCcdCorrector, GainCoefficients, GainLevel, OverscanEstimate,
    OverscanLayout, PhotonConversion, PhotonImages, convert_photons, correct_axis1,
    correct_fastccd, drop_overscan, overscan_background, subtract_overscan,
};

// ============================================================================
// Geometric transforms
// ============================================================================

pub use transform::{RotationSense, rotate90, rotate90_plane, rotation_map};

// ============================================================================
// Stack statistics
// ============================================================================

pub use reduce::{
    Reduction, StatisticsMaps, group_means, group_sums, reduce, stack_mean, stack_stderr,
    stack_std, stack_sum, stack_variance,
};

// ============================================================================
// Photon counting
// ============================================================================

pub use photon_count::{FeatureMaps, NoData, PhotonCountConfig, Window, count_photons};
