//! Fixed-point encoding of bandwidth fractions.
//!
//! A bandwidth register holds `round(fraction * 2^fraction_bits)` as an
//! unsigned integer. The integer/fraction split is a property of the synthesized
//! IP instance, so it is configured per handler rather than fixed at compile
//! time.

use crate::IsolationError;

/// Integer/fraction bit split of a bandwidth register.
///
/// Constructed through [`FixedPointFormat::new`] so an instance always fits a
/// 32-bit register. Serialized configuration goes through
/// [`crate::ThrottledIsolationConfig`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixedPointFormat {
    integer_bits: u32,
    fraction_bits: u32,
}

impl Default for FixedPointFormat {
    fn default() -> Self {
        Self {
            integer_bits: 8,
            fraction_bits: 8,
        }
    }
}

impl FixedPointFormat {
    /// Validates and creates a format.
    ///
    /// # Errors
    ///
    /// Returns [`IsolationError::InvalidFixedPointFormat`] when
    /// `fraction_bits > 31` or the total width exceeds 32 bits.
    pub const fn new(integer_bits: u32, fraction_bits: u32) -> Result<Self, IsolationError> {
        let fits = match integer_bits.checked_add(fraction_bits) {
            Some(total) => total <= u32::BITS,
            None => false,
        };
        if fraction_bits >= u32::BITS || !fits {
            return Err(IsolationError::InvalidFixedPointFormat {
                integer_bits,
                fraction_bits,
            });
        }
        Ok(Self {
            integer_bits,
            fraction_bits,
        })
    }

    /// Integer bits of the register.
    #[must_use]
    pub const fn integer_bits(self) -> u32 {
        self.integer_bits
    }

    /// Fraction bits of the register.
    #[must_use]
    pub const fn fraction_bits(self) -> u32 {
        self.fraction_bits
    }

    /// `2^fraction_bits` as a float scale factor.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn scale(self) -> f64 {
        (1_u64 << self.fraction_bits) as f64
    }

    /// Smallest representable step, `1 / 2^fraction_bits`.
    #[must_use]
    pub fn resolution(self) -> f64 {
        self.scale().recip()
    }

    /// Largest raw code that fits the configured width.
    #[must_use]
    pub const fn max_raw(self) -> u32 {
        let width = self.integer_bits + self.fraction_bits;
        if width >= u32::BITS {
            u32::MAX
        } else {
            (1_u32 << width) - 1
        }
    }

    /// Largest representable value.
    #[must_use]
    pub fn max_value(self) -> f32 {
        self.decode(self.max_raw())
    }

    /// Encodes `value` as `round(value * 2^fraction_bits)`.
    ///
    /// No range check is applied. Negative and NaN inputs encode to `0` and
    /// values past `u32::MAX` saturate, following float-to-int cast rules;
    /// values inside `u32` but past [`Self::max_raw`] are passed through and
    /// the hardware decides what to do with the extra bits.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn encode(self, value: f32) -> u32 {
        (f64::from(value) * self.scale()).round() as u32
    }

    /// Decodes a raw register code as `raw / 2^fraction_bits`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn decode(self, raw: u32) -> f32 {
        (f64::from(raw) / self.scale()) as f32
    }
}
