use thiserror::Error;

use crate::BusError;

/// Failures surfaced by isolation handler operations.
///
/// Hardware fault flags (timeout, oversize) are not errors; they are read back
/// as plain booleans. This type only covers transport failures, invalid
/// construction parameters and the optional bounded decouple wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum IsolationError {
    /// The register bus failed to complete an access.
    #[error(transparent)]
    Bus(#[from] BusError),
    /// The fixed-point token format does not fit a 32-bit register.
    #[error(
        "fixed-point format {integer_bits}.{fraction_bits} does not fit a 32-bit bandwidth register"
    )]
    InvalidFixedPointFormat {
        /// Requested integer bit count.
        integer_bits: u32,
        /// Requested fraction bit count.
        fraction_bits: u32,
    },
    /// The decouple-done bit was still clear after the allowed number of polls.
    #[error("decouple not acknowledged after {polls} status polls")]
    DecoupleTimeout {
        /// Status reads performed before giving up.
        polls: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::IsolationError;
    use crate::BusError;

    #[test]
    fn bus_errors_convert_transparently() {
        let err = IsolationError::from(BusError::WriteFailed { offset: 0x8 });
        assert_eq!(err, IsolationError::Bus(BusError::WriteFailed { offset: 0x8 }));
        assert_eq!(
            err.to_string(),
            BusError::WriteFailed { offset: 0x8 }.to_string()
        );
    }

    #[test]
    fn format_error_names_both_widths() {
        let err = IsolationError::InvalidFixedPointFormat {
            integer_bits: 20,
            fraction_bits: 16,
        };
        assert!(err.to_string().contains("20.16"));
    }
}
