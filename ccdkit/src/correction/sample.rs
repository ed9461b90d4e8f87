//! Encoded detector sample layout.
//!
//! A FastCCD ADC word packs a 13-bit intensity with status bits:
//!
//! ```text
//!  15 14 13 12 ........ 0
//! [gain ][B][  value    ]
//! ```
//!
//! `B` flags a bad pixel. The two gain-select bits choose one of three gain
//! regimes; `11` selects [`GainLevel::G2`], `10` selects [`GainLevel::G1`] and
//! anything else falls back to [`GainLevel::G0`].

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

/// Bits carrying the intensity value.
pub const PIXEL_MASK: u16 = 0x1FFF;
/// Bad pixel flag.
pub const BAD_PIXEL: u16 = 0x2000;
/// Gain-select pattern for [`GainLevel::G1`].
pub const GAIN_SELECT_1: u16 = 0x8000;
/// Gain-select pattern for [`GainLevel::G2`].
pub const GAIN_SELECT_2: u16 = 0xC000;

/// Discrete gain regime of a sample. The discriminant indexes per-gain
/// background planes and gain coefficients.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumIter, Serialize, Deserialize,
)]
pub enum GainLevel {
    #[default]
    G0 = 0,
    G1 = 1,
    G2 = 2,
}

impl GainLevel {
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// A raw sample split into its fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedSample {
    pub value: u16,
    pub bad: bool,
    pub gain: GainLevel,
}

impl DecodedSample {
    #[inline]
    pub fn decode(raw: u16) -> Self {
        let gain = if raw & GAIN_SELECT_2 == GAIN_SELECT_2 {
            GainLevel::G2
        } else if raw & GAIN_SELECT_1 == GAIN_SELECT_1 {
            GainLevel::G1
        } else {
            GainLevel::G0
        };

        Self {
            value: raw & PIXEL_MASK,
            bad: raw & BAD_PIXEL == BAD_PIXEL,
            gain,
        }
    }

    /// Pack the fields back into a raw word. `value` is masked.
    #[inline]
    pub fn encode(self) -> u16 {
        let gain_bits = match self.gain {
            GainLevel::G0 => 0,
            GainLevel::G1 => GAIN_SELECT_1,
            GainLevel::G2 => GAIN_SELECT_2,
        };
        let bad_bit = if self.bad { BAD_PIXEL } else { 0 };
        gain_bits | bad_bit | (self.value & PIXEL_MASK)
    }
}
