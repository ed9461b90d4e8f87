//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use ccdkit::prelude::*;
//! ```

// Core types
pub use crate::{Error, ExecutionConfig, ImageStack, Plane, Result, StackShape};

// Correction
pub use crate::{
    Axis1Corrector, FastCcdCorrector, GainCoefficients, OverscanEstimate, OverscanLayout,
    PhotonConversion, convert_photons, subtract_overscan,
};

// Transforms
pub use crate::{RotationSense, rotate90};

// Statistics
pub use crate::{Reduction, StatisticsMaps, reduce, stack_mean};

// Photon counting
pub use crate::{FeatureMaps, NoData, PhotonCountConfig, Window, count_photons};
