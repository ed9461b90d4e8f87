//! Background, flat-field and gain correction of raw detector frames.
//!
//! Two detector flavours are supported:
//!
//! - **AXIS1**: a single dark plane. Corrected frames are rotated 90°
//!   clockwise in the same pass, so the output has the trailing two
//!   dimensions swapped.
//! - **FastCCD**: three dark planes, one per gain regime. Each sample is
//!   decoded into value, gain and bad-pixel flag; bad pixels become NaN. The
//!   output keeps the input shape.
//!
//! The free functions validate shapes and run the kernel. [`Axis1Corrector`]
//! and [`FastCcdCorrector`] hold optional calibration frames and substitute
//! neutral ones (zero dark, unit flat) for whatever is missing.
//!
//! FastCCD frames read out with overscan rows are trimmed and dark-leveled
//! by [`overscan`]; corrected ADU values are turned into photon counts by
//! [`photons`].

pub mod overscan;
pub mod photons;
pub mod sample;


use std::borrow::Cow;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

pub use overscan::{
    OverscanEstimate, OverscanLayout, drop_overscan, overscan_background, subtract_overscan,
};
pub use photons::{PhotonConversion, PhotonImages, REFERENCE_ENERGY_EV, convert_photons};
pub use sample::{BAD_PIXEL, DecodedSample, GAIN_SELECT_1, GAIN_SELECT_2, GainLevel, PIXEL_MASK};

use crate::common::try_filled_vec;
use crate::error::{Error, Result};
use crate::stack::{ImageStack, Plane, StackShape, check_plane_shape};
use crate::transform::{RotationSense, remap_planes, rotation_map};

/// Number of gain regimes, and therefore of FastCCD background planes.
pub const GAIN_LEVELS: usize = 3;

/// Per-gain multipliers applied after flat-field scaling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GainCoefficients(pub [f32; GAIN_LEVELS]);

impl Default for GainCoefficients {
    /// The FastCCD ADC ratios: `(1, 4, 8)`.
    fn default() -> Self {
        Self([1.0, 4.0, 8.0])
    }
}

impl GainCoefficients {
    pub fn new(g0: f32, g1: f32, g2: f32) -> Self {
        Self([g0, g1, g2])
    }

    /// All gains 1.0.
    pub fn unity() -> Self {
        Self([1.0; GAIN_LEVELS])
    }

    #[inline]
    pub fn get(&self, level: GainLevel) -> f32 {
        self.0[level.index()]
    }
}

// ============================================================================
// AXIS1
// ============================================================================

/// Correct an AXIS1 stack and rotate every plane 90° clockwise.
///
/// For each sample: zero stays `0.0`, otherwise
/// `flat * (value - background)`. The output plane is `width × height`.
pub fn correct_axis1(
    samples: &ImageStack<u16>,
    background: &Plane<f32>,
    flat: &Plane<f32>,
) -> Result<ImageStack<f32>> {
    let (height, width) = (samples.height(), samples.width());
    check_plane_shape(
        "background",
        height,
        width,
        background.height(),
        background.width(),
    )?;
    check_plane_shape("flat field", height, width, flat.height(), flat.width())?;

    let map = rotation_map(height, width, RotationSense::Clockwise)?;
    let mut out = try_filled_vec(samples.len(), 0.0f32, "corrected stack")?;

    let plane_len = samples.plane_len();
    let raw = samples.as_slice();
    let background = background.pixels();
    let flat = flat.pixels();

    remap_planes(&mut out, &map, height, |plane, src_idx| {
        correct_axis1_sample(raw[plane * plane_len + src_idx], background[src_idx], flat[src_idx])
    });

    ImageStack::with_shape(samples.shape().with_swapped_plane_axes(), out)
}

#[inline]
fn correct_axis1_sample(raw: u16, background: f32, flat: f32) -> f32 {
    if raw == 0 {
        return 0.0;
    }
    let value = DecodedSample::decode(raw).value;
    flat * (value as f32 - background)
}

// ============================================================================
// FastCCD
// ============================================================================

/// Decode and correct a FastCCD stack.
///
/// `background` must hold exactly three planes, indexed by [`GainLevel`].
/// Bad pixels become NaN; every other sample becomes
/// `flat * gain[level] * (value - background[level])`.
pub fn correct_fastccd(
    samples: &ImageStack<u16>,
    background: &ImageStack<f32>,
    flat: &Plane<f32>,
    gain: &GainCoefficients,
) -> Result<ImageStack<f32>> {
    let (height, width) = (samples.height(), samples.width());
    if background.plane_count() != GAIN_LEVELS {
        return Err(Error::BackgroundPlaneCount {
            actual: background.plane_count(),
        });
    }
    check_plane_shape(
        "background",
        height,
        width,
        background.height(),
        background.width(),
    )?;
    check_plane_shape("flat field", height, width, flat.height(), flat.width())?;

    let mut out = try_filled_vec(samples.len(), 0.0f32, "corrected stack")?;

    let backgrounds = [background.plane(0), background.plane(1), background.plane(2)];
    let flat = flat.pixels();

    out.par_chunks_mut(width)
        .zip(samples.as_slice().par_chunks(width))
        .enumerate()
        .for_each(|(row_idx, (out_row, raw_row))| {
            let offset = (row_idx % height) * width;
            for (x, (value, &raw)) in out_row.iter_mut().zip(raw_row).enumerate() {
                let idx = offset + x;
                *value = correct_fastccd_sample(raw, &backgrounds, idx, flat[idx], gain);
            }
        });

    ImageStack::with_shape(samples.shape().clone(), out)
}

#[inline]
fn correct_fastccd_sample(
    raw: u16,
    backgrounds: &[&[f32]; GAIN_LEVELS],
    idx: usize,
    flat: f32,
    gain: &GainCoefficients,
) -> f32 {
    let sample = DecodedSample::decode(raw);
    if sample.bad {
        return f32::NAN;
    }
    let background = backgrounds[sample.gain.index()][idx];
    flat * gain.get(sample.gain) * (sample.value as f32 - background)
}

// ============================================================================
// Correctors with optional calibration frames
// ============================================================================

/// AXIS1 correction with optional dark and flat frames.
#[derive(Debug, Clone, Default)]
pub struct Axis1Corrector {
    /// Dark plane. Missing means no dark subtraction.
    pub background: Option<Plane<f32>>,
    /// Flat-field plane. Missing means no flat-field correction.
    pub flat: Option<Plane<f32>>,
}

impl Axis1Corrector {
    pub fn new(background: Option<Plane<f32>>, flat: Option<Plane<f32>>) -> Self {
        Self { background, flat }
    }

    pub fn correct(&self, samples: &ImageStack<u16>) -> Result<ImageStack<f32>> {
        let start = Instant::now();
        tracing::info!("Correcting AXIS1 image stack of shape {:?}", samples.dims());

        let (height, width) = (samples.height(), samples.width());
        let background = match &self.background {
            Some(background) => Cow::Borrowed(background),
            None => {
                tracing::info!("Not correcting for darkfield. No input.");
                Cow::Owned(neutral_plane(height, width, 0.0)?)
            }
        };
        let flat = match &self.flat {
            Some(flat) => Cow::Borrowed(flat),
            None => {
                tracing::info!("Not correcting for flatfield. No input.");
                Cow::Owned(neutral_plane(height, width, 1.0)?)
            }
        };

        let corrected = correct_axis1(samples, &background, &flat)?;

        tracing::info!(
            "Corrected image stack in {:.3} seconds",
            start.elapsed().as_secs_f64()
        );
        Ok(corrected)
    }
}

/// FastCCD correction with optional dark and flat frames.
#[derive(Debug, Clone, Default)]
pub struct FastCcdCorrector {
    /// Three dark planes, one per gain level. Missing means no dark subtraction.
    pub background: Option<ImageStack<f32>>,
    /// Flat-field plane. Missing means no flat-field correction.
    pub flat: Option<Plane<f32>>,
    pub gain: GainCoefficients,
}

impl FastCcdCorrector {
    pub fn new(
        background: Option<ImageStack<f32>>,
        flat: Option<Plane<f32>>,
        gain: GainCoefficients,
    ) -> Self {
        Self {
            background,
            flat,
            gain,
        }
    }

    pub fn correct(&self, samples: &ImageStack<u16>) -> Result<ImageStack<f32>> {
        let start = Instant::now();
        tracing::info!("Correcting FastCCD image stack of shape {:?}", samples.dims());

        let (height, width) = (samples.height(), samples.width());
        let background = match &self.background {
            Some(background) => Cow::Borrowed(background),
            None => {
                tracing::info!("Not correcting for darkfield. No input.");
                let shape = StackShape::new(&[GAIN_LEVELS, height, width])?;
                let zeros = try_filled_vec(shape.len(), 0.0f32, "background")?;
                Cow::Owned(ImageStack::with_shape(shape, zeros)?)
            }
        };
        let flat = match &self.flat {
            Some(flat) => Cow::Borrowed(flat),
            None => {
                tracing::info!("Not correcting for flatfield. No input.");
                Cow::Owned(neutral_plane(height, width, 1.0)?)
            }
        };

        let corrected = correct_fastccd(samples, &background, &flat, &self.gain)?;

        tracing::info!(
            "Corrected image stack in {:.3} seconds",
            start.elapsed().as_secs_f64()
        );
        Ok(corrected)
    }
}

fn neutral_plane(height: usize, width: usize, value: f32) -> Result<Plane<f32>> {
    let pixels = try_filled_vec(height * width, value, "calibration plane")?;
    Ok(Plane::from_parts(height, width, pixels))
}
