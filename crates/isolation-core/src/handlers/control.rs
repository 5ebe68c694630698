use crate::config::IsolationConfig;
use crate::layout::CONTROL_LAYOUT;
use crate::{DecoupleProtocol, FaultFlags, IsolationError, RegisterBus};

/// Handler for the control-plane isolation IP.
///
/// Registers: status at `base + 0x0` (bit 0 request, bit 1 done) and fault at
/// `base + 0x4` (bit 1 timeout).
#[derive(Debug)]
pub struct ControlIsolation<B> {
    protocol: DecoupleProtocol<B>,
}

impl<B: RegisterBus> ControlIsolation<B> {
    /// Binds a bus to the IP at `base_offset`.
    #[must_use]
    pub const fn new(bus: B, base_offset: u32) -> Self {
        Self {
            protocol: DecoupleProtocol::new(bus, base_offset, &CONTROL_LAYOUT),
        }
    }

    /// Builds the handler from a configuration record.
    #[must_use]
    pub const fn from_config(bus: B, config: &IsolationConfig) -> Self {
        Self::new(bus, config.base_offset)
    }

    /// Byte offset of the IP's first register.
    #[must_use]
    pub const fn base_offset(&self) -> u32 {
        self.protocol.base_offset()
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

    /// Reports the protocol timeout flag.
    ///
    /// # Errors
    ///
    /// Returns [`IsolationError::Bus`] if the read fails.
    pub fn is_timed_out(&mut self) -> Result<bool, IsolationError> {
        self.protocol.is_timed_out()
    }

    /// Clears the timeout by writing `0` to the whole fault register.
    ///
    /// Any other fault bit latched in that register is cleared as well.
    ///
    /// # Errors
    ///
    /// Returns [`IsolationError::Bus`] if the write fails.
    pub fn reset_timeout(&mut self) -> Result<(), IsolationError> {
        self.protocol.reset_timeout()
    }

    /// Reads the fault register once and decodes it.
    ///
    /// # Errors
    ///
    /// Returns [`IsolationError::Bus`] if the read fails.
    pub fn faults(&mut self) -> Result<FaultFlags, IsolationError> {
        self.protocol.faults()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::ControlIsolation;
    use crate::config::IsolationConfig;
    use crate::{BusError, RegisterBus};

    struct FixedBus {
        value: u32,
        writes: Vec<(u32, u32)>,
    }

    impl RegisterBus for FixedBus {
        fn read32(&mut self, _offset: u32) -> Result<u32, BusError> {
            Ok(self.value)
        }

        fn write32(&mut self, offset: u32, value: u32) -> Result<(), BusError> {
            self.writes.push((offset, value));
            Ok(())
        }
    }

    #[rstest]
    #[case(0x0, false)]
    #[case(0x2, true)]
    #[case(0x1, false)]
    #[case(0xFFFF_FFFD, false)]
    #[case(0xFFFF_FFFF, true)]
    fn timeout_is_bit_one(#[case] fault: u32, #[case] expected: bool) {
        let mut ctrl = ControlIsolation::new(
            FixedBus {
                value: fault,
                writes: Vec::new(),
            },
            0x40,
        );
        assert_eq!(ctrl.is_timed_out(), Ok(expected));
    }

    #[test]
    fn reset_timeout_clears_every_fault_bit() {
        let mut ctrl = ControlIsolation::from_config(
            FixedBus {
                value: 0xFFFF_FFFF,
                writes: Vec::new(),
            },
            &IsolationConfig { base_offset: 0x40 },
        );
        ctrl.reset_timeout().expect("reset");
        assert_eq!(ctrl.base_offset(), 0x40);
        assert_eq!(ctrl.into_bus().writes, vec![(0x44, 0)]);
    }
}
