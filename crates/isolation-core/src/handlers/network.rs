use crate::config::{ThrottleSetting, ThrottledIsolationConfig};
use crate::layout::{NETWORK_LAYOUT, NETWORK_OVERSIZE};
use crate::throttle::Throttle;
use crate::{
    DecoupleProtocol, FaultFlags, FixedPointFormat, IsolationError, RegisterBus, ThrottleChannel,
};

/// Handler for the network interface isolation IP.
///
/// Fault register bits: 2 = oversized frame, 3 = protocol timeout. Both are
/// cleared with a read-modify-write so clearing one leaves the other latched.
/// A single unified throttle sits at `base + 0x8` / `base + 0xC`.
#[derive(Debug)]
pub struct NetworkIsolation<B> {
    protocol: DecoupleProtocol<B>,
    format: FixedPointFormat,
}

impl<B: RegisterBus> NetworkIsolation<B> {
    /// Binds a bus to the IP at `base_offset` with the given token format.
    #[must_use]
    pub const fn new(bus: B, base_offset: u32, format: FixedPointFormat) -> Self {
        Self {
            protocol: DecoupleProtocol::new(bus, base_offset, &NETWORK_LAYOUT),
            format,
        }
    }

    /// Builds the handler from a configuration record.
    ///
    /// # Errors
    ///
    /// Returns [`IsolationError::InvalidFixedPointFormat`] when the configured
    /// token widths do not fit a 32-bit register.
    pub fn from_config(bus: B, config: &ThrottledIsolationConfig) -> Result<Self, IsolationError> {
        Ok(Self::new(bus, config.base_offset, config.token_format()?))
    }

    /// Byte offset of the IP's first register.
    #[must_use]
    pub const fn base_offset(&self) -> u32 {
        self.protocol.base_offset()
    }

    /// Bandwidth register format.
    #[must_use]
    pub const fn format(&self) -> FixedPointFormat {
        self.format
    }

    /// Releases the bus.
    #[must_use]
    pub fn into_bus(self) -> B {
        self.protocol.into_bus()
    }

    /// Decouples the interface, blocking until the IP confirms.
    ///
    /// # Errors
    ///
    /// Returns [`IsolationError::Bus`] if a register access fails.
    pub fn decouple(&mut self) -> Result<(), IsolationError> {
        self.protocol.decouple()
    }

    /// Decouples the interface, polling at most `max_polls` times.
    ///
    /// # Errors
    ///
    /// Returns [`IsolationError::DecoupleTimeout`] if the IP does not confirm
    /// in time, or [`IsolationError::Bus`] if a register access fails.
    pub fn decouple_bounded(&mut self, max_polls: u32) -> Result<(), IsolationError> {
        self.protocol.decouple_bounded(max_polls)
    }

    /// Releases the decoupling.
    ///
    /// # Errors
    ///
    /// Returns [`IsolationError::Bus`] if the write fails.
    pub fn recouple(&mut self) -> Result<(), IsolationError> {
        self.protocol.recouple()
    }

    /// Reports whether the IP currently signals decouple completion.
    ///
    /// # Errors
    ///
    /// Returns [`IsolationError::Bus`] if the read fails.
    pub fn is_decoupled(&mut self) -> Result<bool, IsolationError> {
        self.protocol.is_decoupled()
    }

    /// Reports the protocol timeout flag (bit 3).
    ///
    /// # Errors
    ///
    /// Returns [`IsolationError::Bus`] if the read fails.
    pub fn is_timed_out(&mut self) -> Result<bool, IsolationError> {
        self.protocol.is_timed_out()
    }

    /// Clears only the timeout flag, preserving every other fault bit.
    ///
    /// # Errors
    ///
    /// Returns [`IsolationError::Bus`] if an access fails.
    pub fn reset_timeout(&mut self) -> Result<(), IsolationError> {
        self.protocol.reset_timeout()
    }

    /// Reports the oversized-frame flag (bit 2).
    ///
    /// # Errors
    ///
    /// Returns [`IsolationError::Bus`] if the read fails.
    pub fn is_oversized(&mut self) -> Result<bool, IsolationError> {
        self.protocol.read_flag(NETWORK_OVERSIZE)
    }

    /// Clears only the oversized-frame flag, preserving every other fault bit.
    ///
    /// # Errors
    ///
    /// Returns [`IsolationError::Bus`] if an access fails.
    pub fn reset_oversize(&mut self) -> Result<(), IsolationError> {
        log::debug!(
            "Network isolation at {:#x} clearing oversize",
            self.base_offset()
        );
        self.protocol.clear_flag(NETWORK_OVERSIZE)
    }

    /// Reads the fault register once and decodes it.
    ///
    /// # Errors
    ///
    /// Returns [`IsolationError::Bus`] if the read fails.
    pub fn faults(&mut self) -> Result<FaultFlags, IsolationError> {
        self.protocol.faults()
    }

    fn throttle(&mut self) -> Throttle<'_, B> {
        Throttle::new(&mut self.protocol, ThrottleChannel::Unified, self.format)
    }

    /// Writes the initial token count verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`IsolationError::Bus`] if the write fails.
    pub fn set_initial_tokens(&mut self, tokens: u32) -> Result<(), IsolationError> {
        self.throttle().set_initial_tokens(tokens)
    }

    /// Reads the initial token count.
    ///
    /// # Errors
    ///
    /// Returns [`IsolationError::Bus`] if the read fails.
    pub fn initial_tokens(&mut self) -> Result<u32, IsolationError> {
        self.throttle().initial_tokens()
    }

    /// Encodes and writes the bandwidth fraction.
    ///
    /// # Errors
    ///
    /// Returns [`IsolationError::Bus`] if the write fails.
    pub fn set_bandwidth_fraction(&mut self, fraction: f32) -> Result<(), IsolationError> {
        self.throttle().set_bandwidth_fraction(fraction)
    }

    /// Reads and decodes the bandwidth fraction.
    ///
    /// # Errors
    ///
    /// Returns [`IsolationError::Bus`] if the read fails.
    pub fn bandwidth_fraction(&mut self) -> Result<f32, IsolationError> {
        self.throttle().bandwidth_fraction()
    }

    /// Writes both throttle registers.
    ///
    /// # Errors
    ///
    /// Returns [`IsolationError::Bus`] if either write fails.
    pub fn configure_throttle(&mut self, setting: ThrottleSetting) -> Result<(), IsolationError> {
        self.throttle().apply(setting)
    }

    /// Reads both throttle registers.
    ///
    /// # Errors
    ///
    /// Returns [`IsolationError::Bus`] if either read fails.
    pub fn throttle_setting(&mut self) -> Result<ThrottleSetting, IsolationError> {
        self.throttle().setting()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::NetworkIsolation;
    use crate::{BusError, FixedPointFormat, RegisterBus};

    struct FaultBus {
        fault: u32,
        writes: Vec<(u32, u32)>,
    }

    impl RegisterBus for FaultBus {
        fn read32(&mut self, _offset: u32) -> Result<u32, BusError> {
            Ok(self.fault)
        }

        fn write32(&mut self, offset: u32, value: u32) -> Result<(), BusError> {
            self.writes.push((offset, value));
            Ok(())
        }
    }

    fn handler(fault: u32) -> NetworkIsolation<FaultBus> {
        NetworkIsolation::new(
            FaultBus {
                fault,
                writes: Vec::new(),
            },
            0x300,
            FixedPointFormat::default(),
        )
    }

    #[rstest]
    #[case(0x0, false, false)]
    #[case(0x4, true, false)]
    #[case(0x8, false, true)]
    #[case(0xC, true, true)]
    #[case(0xFFFF_FFF3, false, false)]
    #[case(0xFFFF_FFFF, true, true)]
    fn flags_extract_their_own_bit(
        #[case] fault: u32,
        #[case] oversized: bool,
        #[case] timed_out: bool,
    ) {
        let mut net = handler(fault);
        assert_eq!(net.is_oversized(), Ok(oversized));
        assert_eq!(net.is_timed_out(), Ok(timed_out));
    }

    #[test]
    fn reset_timeout_keeps_oversize_latched() {
        let mut net = handler(0xC);
        net.reset_timeout().expect("reset");
        assert_eq!(net.into_bus().writes, vec![(0x304, 0x4)]);
    }

    #[test]
    fn reset_oversize_keeps_timeout_latched() {
        let mut net = handler(0xC);
        net.reset_oversize().expect("reset");
        assert_eq!(net.into_bus().writes, vec![(0x304, 0x8)]);
    }
}
