use crate::config::{ThrottleSetting, ThrottledIsolationConfig};
use crate::layout::MEMORY_LAYOUT;
use crate::throttle::Throttle;
use crate::{
    DecoupleProtocol, FaultFlags, FixedPointFormat, IsolationError, RegisterBus, ThrottleChannel,
};

/// Handler for the memory interface isolation IP.
///
/// Besides the decouple handshake the IP carries token-bucket throttles,
/// either one unified channel or a split address-write/address-read pair.
///
/// The timeout accessor masks bit 1 and shifts by 3, as the IP's reference
/// driver does, so it always reports `false`. See [`MEMORY_LAYOUT`].
#[derive(Debug)]
pub struct MemoryIsolation<B> {
    protocol: DecoupleProtocol<B>,
    format: FixedPointFormat,
}

impl<B: RegisterBus> MemoryIsolation<B> {
    /// Binds a bus to the IP at `base_offset` with the given token format.
    #[must_use]
    pub const fn new(bus: B, base_offset: u32, format: FixedPointFormat) -> Self {
        Self {
            protocol: DecoupleProtocol::new(bus, base_offset, &MEMORY_LAYOUT),
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

    /// Borrows one throttle channel.
    #[must_use]
    pub fn throttle(&mut self, channel: ThrottleChannel) -> Throttle<'_, B> {
        Throttle::new(&mut self.protocol, channel, self.format)
    }

    /// Writes a channel's initial token count verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`IsolationError::Bus`] if the write fails.
    pub fn set_initial_tokens(
        &mut self,
        channel: ThrottleChannel,
        tokens: u32,
    ) -> Result<(), IsolationError> {
        self.throttle(channel).set_initial_tokens(tokens)
    }

    /// Reads a channel's initial token count.
    ///
    /// # Errors
    ///
    /// Returns [`IsolationError::Bus`] if the read fails.
    pub fn initial_tokens(&mut self, channel: ThrottleChannel) -> Result<u32, IsolationError> {
        self.throttle(channel).initial_tokens()
    }

    /// Encodes and writes a channel's bandwidth fraction.
    ///
    /// # Errors
    ///
    /// Returns [`IsolationError::Bus`] if the write fails.
    pub fn set_bandwidth_fraction(
        &mut self,
        channel: ThrottleChannel,
        fraction: f32,
    ) -> Result<(), IsolationError> {
        self.throttle(channel).set_bandwidth_fraction(fraction)
    }

    /// Reads and decodes a channel's bandwidth fraction.
    ///
    /// # Errors
    ///
    /// Returns [`IsolationError::Bus`] if the read fails.
    pub fn bandwidth_fraction(&mut self, channel: ThrottleChannel) -> Result<f32, IsolationError> {
        self.throttle(channel).bandwidth_fraction()
    }

    /// Writes both registers of a channel.
    ///
    /// # Errors
    ///
    /// Returns [`IsolationError::Bus`] if either write fails.
    pub fn configure_throttle(
        &mut self,
        channel: ThrottleChannel,
        setting: ThrottleSetting,
    ) -> Result<(), IsolationError> {
        self.throttle(channel).apply(setting)
    }
}
