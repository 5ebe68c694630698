//! Behavioral model of the clock/reset decoupler IP.

use isolation_core::handlers::{CLOCK_DECOUPLE_REG, RESET_REG};
use isolation_core::{BusError, RegisterBus};
use log::trace;

const SPAN: u32 = 0x8;

/// Level change observed on the decoupler's outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClockResetEvent {
    /// Clock gate changed; `true` means the clock is gated.
    Clock(bool),
    /// Reset line changed; `true` means reset is asserted.
    Reset(bool),
}

/// Simulated clock/reset decoupler mapped at a base offset.
#[derive(Debug, Clone, Default)]
pub struct ClockResetModel {
    base: u32,
    clock_gated: bool,
    reset_asserted: bool,
    events: Vec<ClockResetEvent>,
}

impl ClockResetModel {
    /// Creates a decoupler at `base` with the clock running and reset released.
    #[must_use]
    pub const fn new(base: u32) -> Self {
        Self {
            base,
            clock_gated: false,
            reset_asserted: false,
            events: Vec::new(),
        }
    }

    /// First byte offset decoded by the block.
    #[must_use]
    pub const fn base(&self) -> u32 {
        self.base
    }

    /// Bytes of register space decoded by the block.
    #[must_use]
    pub const fn span(&self) -> u32 {
        SPAN
    }

    /// Returns `true` while the application clock is gated.
    #[must_use]
    pub const fn clock_gated(&self) -> bool {
        self.clock_gated
    }

    /// Returns `true` while the application is held in reset.
    #[must_use]
    pub const fn reset_asserted(&self) -> bool {
        self.reset_asserted
    }

    /// Level changes in the order they happened. Writes that keep the current
    /// level are not recorded.
    #[must_use]
    pub fn events(&self) -> &[ClockResetEvent] {
        &self.events
    }

    /// Returns `true` if reset was ever asserted while the clock was running.
    #[must_use]
    pub fn reset_toggled_with_clock_running(&self) -> bool {
        let mut gated = false;
        self.events.iter().any(|event| match *event {
            ClockResetEvent::Clock(level) => {
                gated = level;
                false
            }
            ClockResetEvent::Reset(_) => !gated,
        })
    }

    fn delta(&self, offset: u32) -> Result<u32, BusError> {
        offset
            .checked_sub(self.base)
            .filter(|delta| *delta == CLOCK_DECOUPLE_REG || *delta == RESET_REG)
            .ok_or(BusError::Unmapped { offset })
    }
}

impl RegisterBus for ClockResetModel {
    fn read32(&mut self, offset: u32) -> Result<u32, BusError> {
        let level = match self.delta(offset)? {
            CLOCK_DECOUPLE_REG => self.clock_gated,
            _ => self.reset_asserted,
        };
        Ok(u32::from(level))
    }

    fn write32(&mut self, offset: u32, value: u32) -> Result<(), BusError> {
        let level = value & 0x1 != 0;
        let delta = self.delta(offset)?;
        trace!("clock/reset model write +{delta:#x} <- {value:#x}");
        if delta == CLOCK_DECOUPLE_REG {
            if level != self.clock_gated {
                self.clock_gated = level;
                self.events.push(ClockResetEvent::Clock(level));
            }
        } else if level != self.reset_asserted {
            self.reset_asserted = level;
            self.events.push(ClockResetEvent::Reset(level));
        }
        Ok(())
    }
}
