//! Construction parameters for isolation handlers.

use crate::{FixedPointFormat, IsolationError};

/// Addressing parameters for handlers without a bandwidth throttle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct IsolationConfig {
    /// Byte offset of the IP's first register.
    pub base_offset: u32,
}

/// Addressing and token format parameters for throttled isolation IPs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ThrottledIsolationConfig {
    /// Byte offset of the IP's first register.
    pub base_offset: u32,
    /// Integer bits of the bandwidth register.
    pub token_integer_bits: u32,
    /// Fraction bits of the bandwidth register.
    pub token_fraction_bits: u32,
}

impl Default for ThrottledIsolationConfig {
    fn default() -> Self {
        let format = FixedPointFormat::default();
        Self {
            base_offset: 0,
            token_integer_bits: format.integer_bits(),
            token_fraction_bits: format.fraction_bits(),
        }
    }
}

impl ThrottledIsolationConfig {
    /// Validates the configured bit widths.
    ///
    /// # Errors
    ///
    /// Returns [`IsolationError::InvalidFixedPointFormat`] when the widths do
    /// not fit a 32-bit register.
    pub const fn token_format(&self) -> Result<FixedPointFormat, IsolationError> {
        FixedPointFormat::new(self.token_integer_bits, self.token_fraction_bits)
    }
}

/// Both registers of one throttle channel.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ThrottleSetting {
    /// Raw bucket seed written verbatim.
    pub initial_tokens: u32,
    /// Share of bus cycles granted, `1.0` meaning every cycle.
    pub bandwidth_fraction: f32,
}
