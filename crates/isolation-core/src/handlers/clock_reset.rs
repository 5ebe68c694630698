use log::debug;

use crate::config::IsolationConfig;
use crate::{IsolationError, RegisterBus};

/// Byte delta of the clock decouple register.
pub const CLOCK_DECOUPLE_REG: u32 = 0x0;
/// Byte delta of the application reset register.
pub const RESET_REG: u32 = 0x4;

/// Handler for the clock/reset decoupler IP.
///
/// Every operation is a single unconditional write of bit 0. There is no
/// completion handshake and no ordering enforcement between the clock and
/// reset controls.
#[derive(Debug)]
pub struct ClockResetDecoupler<B> {
    bus: B,
    base_offset: u32,
}

impl<B: RegisterBus> ClockResetDecoupler<B> {
    /// Binds a bus to the IP at `base_offset`.
    #[must_use]
    pub const fn new(bus: B, base_offset: u32) -> Self {
        Self { bus, base_offset }
    }

    /// Builds the handler from a configuration record.
    #[must_use]
    pub const fn from_config(bus: B, config: &IsolationConfig) -> Self {
        Self::new(bus, config.base_offset)
    }

    /// Byte offset of the IP's first register.
    #[must_use]
    pub const fn base_offset(&self) -> u32 {
        self.base_offset
    }

    /// Releases the bus.
    #[must_use]
    pub fn into_bus(self) -> B {
        self.bus
    }

    fn poke(&mut self, delta: u32, value: u32) -> Result<(), IsolationError> {
        self.bus.write32(self.base_offset.wrapping_add(delta), value)?;
        Ok(())
    }

    /// Gates the application clock.
    ///
    /// # Errors
    ///
    /// Returns [`IsolationError::Bus`] if the write fails.
    pub fn decouple_clock(&mut self) -> Result<(), IsolationError> {
        debug!("clock decoupled at {:#x}", self.base_offset);
        self.poke(CLOCK_DECOUPLE_REG, 0x1)
    }

    /// Ungates the application clock.
    ///
    /// # Errors
    ///
    /// Returns [`IsolationError::Bus`] if the write fails.
    pub fn recouple_clock(&mut self) -> Result<(), IsolationError> {
        debug!("clock recoupled at {:#x}", self.base_offset);
        self.poke(CLOCK_DECOUPLE_REG, 0x0)
    }

    /// Holds the application in reset.
    ///
    /// # Errors
    ///
    /// Returns [`IsolationError::Bus`] if the write fails.
    pub fn assert_reset(&mut self) -> Result<(), IsolationError> {
        debug!("reset asserted at {:#x}", self.base_offset);
        self.poke(RESET_REG, 0x1)
    }

    /// Releases the application reset.
    ///
    /// # Errors
    ///
    /// Returns [`IsolationError::Bus`] if the write fails.
    pub fn deassert_reset(&mut self) -> Result<(), IsolationError> {
        debug!("reset deasserted at {:#x}", self.base_offset);
        self.poke(RESET_REG, 0x0)
    }

    /// Gates the clock, then asserts reset.
    ///
    /// # Errors
    ///
    /// Returns [`IsolationError::Bus`] if a write fails; the reset write is
    /// skipped when the clock write fails.
    pub fn isolate_and_hold_reset(&mut self) -> Result<(), IsolationError> {
        self.decouple_clock()?;
        self.assert_reset()
    }

    /// Releases reset, then ungates the clock.
    ///
    /// # Errors
    ///
    /// Returns [`IsolationError::Bus`] if a write fails; the clock write is
    /// skipped when the reset write fails.
    pub fn release_and_recouple(&mut self) -> Result<(), IsolationError> {
        self.deassert_reset()?;
        self.recouple_clock()
    }
}
