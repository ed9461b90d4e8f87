//! ADU to photon conversion.
//!
//! The detector response scales linearly with photon energy. The response
//! is calibrated at 930 eV, and the ADU-per-photon factor for a measurement
//! is that calibration scaled by the NaN-aware mean beam energy.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::common::try_filled_vec;
use crate::error::{Error, Result};
use crate::stack::ImageStack;

/// Photon energy, in eV, at which the ADU response is calibrated.
pub const REFERENCE_ENERGY_EV: f64 = 930.0;

/// Parameters of the ADU to photon conversion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhotonConversion {
    /// ADU produced by one photon at [`REFERENCE_ENERGY_EV`].
    pub adu_at_reference: f64,
    /// Round the ADU-per-photon factor to tens instead of hundredths.
    pub round_to_tens: bool,
    /// Round converted values to whole photons.
    pub quantize: bool,
}

impl Default for PhotonConversion {
    fn default() -> Self {
        Self {
            adu_at_reference: 30.0,
            round_to_tens: true,
            quantize: true,
        }
    }
}

impl PhotonConversion {
    /// ADU per photon at the mean of `energy` (eV), ignoring NaN entries.
    ///
    /// Rounding is half-to-even, to tens or to hundredths.
    pub fn adu_per_photon(&self, energy: &[f64]) -> Result<f64> {
        let (sum, count) = energy
            .iter()
            .filter(|e| !e.is_nan())
            .fold((0.0, 0usize), |(sum, count), &e| (sum + e, count + 1));
        if count == 0 {
            return Err(Error::InvalidParameter {
                name: "energy",
                reason: "at least one energy reading that is not NaN is required".to_string(),
            });
        }

        let scaled = self.adu_at_reference * (sum / count as f64) / REFERENCE_ENERGY_EV;
        let adu = if self.round_to_tens {
            (scaled / 10.0).round_ties_even() * 10.0
        } else {
            (scaled * 100.0).round_ties_even() / 100.0
        };

        if !(adu.is_finite() && adu > 0.0) {
            return Err(Error::InvalidParameter {
                name: "adu_per_photon",
                reason: format!("must be positive and finite, got {adu} from {scaled}"),
            });
        }
        Ok(adu)
    }
}

/// Converted stack and the factor used.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotonImages {
    pub photons: ImageStack<f32>,
    pub adu_per_photon: f64,
}

impl PhotonImages {
    /// Whole photon counts. NaN samples count as zero.
    pub fn to_counts(&self) -> Result<ImageStack<i32>> {
        let mut counts = try_filled_vec(self.photons.len(), 0i32, "photon counts")?;
        counts
            .par_iter_mut()
            .zip(self.photons.as_slice().par_iter())
            .for_each(|(count, &photons)| {
                // `as` saturates and maps NaN to zero
                *count = photons.round_ties_even() as i32;
            });
        ImageStack::with_shape(self.photons.shape().clone(), counts)
    }
}

/// Divide every sample by the ADU-per-photon factor for `energy`.
pub fn convert_photons(
    stack: &ImageStack<f32>,
    energy: &[f64],
    conversion: &PhotonConversion,
) -> Result<PhotonImages> {
    let adu_per_photon = conversion.adu_per_photon(energy)?;
    tracing::info!(
        "Converting ADU to photons at {:.2} ADU per photon",
        adu_per_photon
    );

    let scale = adu_per_photon as f32;
    let quantize = conversion.quantize;
    let mut photons = try_filled_vec(stack.len(), 0.0f32, "photon stack")?;
    photons
        .par_iter_mut()
        .zip(stack.as_slice().par_iter())
        .for_each(|(out, &adu)| {
            let value = adu / scale;
            *out = if quantize {
                value.round_ties_even()
            } else {
                value
            };
        });

    Ok(PhotonImages {
        photons: ImageStack::with_shape(stack.shape().clone(), photons)?,
        adu_per_photon,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adu_per_photon_at_reference_energy() {
        let conversion = PhotonConversion::default();
        assert_eq!(conversion.adu_per_photon(&[930.0]).unwrap(), 30.0);
    }

    #[test]
    fn test_adu_per_photon_rounds_to_tens() {
        let conversion = PhotonConversion::default();
        // 30 * 708 / 930 = 22.84
        assert_eq!(conversion.adu_per_photon(&[708.0]).unwrap(), 20.0);
        // 30 * 1550 / 930 = 50.0
        assert_eq!(conversion.adu_per_photon(&[1550.0]).unwrap(), 50.0);
    }

    #[test]
    fn test_adu_per_photon_rounds_to_hundredths() {
        let conversion = PhotonConversion {
            round_to_tens: false,
            ..PhotonConversion::default()
        };
        assert_eq!(conversion.adu_per_photon(&[708.0]).unwrap(), 22.84);
    }

    #[test]
    fn test_adu_per_photon_ignores_nan_energy() {
        let conversion = PhotonConversion::default();
        let adu = conversion
            .adu_per_photon(&[f64::NAN, 900.0, 960.0, f64::NAN])
            .unwrap();
        assert_eq!(adu, 30.0);
    }

    #[test]
    fn test_adu_per_photon_rejects_missing_energy() {
        let conversion = PhotonConversion::default();
        for energy in [&[][..], &[f64::NAN, f64::NAN][..]] {
            let err = conversion.adu_per_photon(energy).unwrap_err();
            assert!(matches!(err, Error::InvalidParameter { name: "energy", .. }));
        }
    }

    #[test]
    fn test_adu_per_photon_rejects_factor_rounded_to_zero() {
        // 30 * 100 / 930 = 3.2, which rounds to zero tens
        let err = PhotonConversion::default()
            .adu_per_photon(&[100.0])
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { name: "adu_per_photon", .. }));
    }

    #[test]
    fn test_convert_quantized() {
        let stack = ImageStack::new(&[1, 2, 3], vec![0.0f32, 29.0, 31.0, 45.0, 75.0, f32::NAN]).unwrap();
        let converted = convert_photons(&stack, &[930.0], &PhotonConversion::default()).unwrap();

        assert_eq!(converted.adu_per_photon, 30.0);
        assert_eq!(converted.photons.dims(), &[1, 2, 3]);
        // 1.5 and 2.5 round to even
        assert_eq!(&converted.photons.as_slice()[..5], &[0.0, 1.0, 1.0, 2.0, 2.0]);
        assert!(converted.photons.as_slice()[5].is_nan());

        let counts = converted.to_counts().unwrap();
        assert_eq!(counts.as_slice(), &[0, 1, 1, 2, 2, 0]);
    }

    #[test]
    fn test_convert_without_quantization() {
        let stack = ImageStack::new(&[1, 2], vec![15.0f32, 60.0]).unwrap();
        let conversion = PhotonConversion {
            quantize: false,
            ..PhotonConversion::default()
        };
        let converted = convert_photons(&stack, &[930.0], &conversion).unwrap();
        assert_eq!(converted.photons.as_slice(), &[0.5, 2.0]);
    }

    #[test]
    fn test_conversion_serde_defaults() {
        let conversion: PhotonConversion =
            serde_json::from_str(r#"{"adu_at_reference": 25.0}"#).unwrap();
        assert_eq!(conversion.adu_at_reference, 25.0);
        assert!(conversion.round_to_tens);
        assert!(conversion.quantize);
    }
}
