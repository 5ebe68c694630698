//! Token-bucket bandwidth throttle registers.
//!
//! Each channel owns two registers: a raw initial token count and a
//! fixed-point bandwidth fraction (share of bus cycles, `1.0` = every cycle).

use log::{debug, warn};

use crate::config::ThrottleSetting;
use crate::{DecoupleProtocol, FixedPointFormat, IsolationError, RegisterBus, ThrottleChannel};

/// Borrowed view of one throttle channel on an isolation IP.
#[derive(Debug)]
pub struct Throttle<'a, B> {
    protocol: &'a mut DecoupleProtocol<B>,
    channel: ThrottleChannel,
    format: FixedPointFormat,
}

impl<'a, B: RegisterBus> Throttle<'a, B> {
    pub(crate) fn new(
        protocol: &'a mut DecoupleProtocol<B>,
        channel: ThrottleChannel,
        format: FixedPointFormat,
    ) -> Self {
        Self {
            protocol,
            channel,
            format,
        }
    }

    /// Channel addressed by this view.
    #[must_use]
    pub const fn channel(&self) -> ThrottleChannel {
        self.channel
    }

    /// Writes the initial token count verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`IsolationError::Bus`] if the write fails.
    pub fn set_initial_tokens(&mut self, tokens: u32) -> Result<(), IsolationError> {
        debug!("{:?} throttle initial tokens <- {tokens}", self.channel);
        self.protocol
            .write_register(self.channel.initial_tokens_reg(), tokens)
    }

    /// Reads the initial token count verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`IsolationError::Bus`] if the read fails.
    pub fn initial_tokens(&mut self) -> Result<u32, IsolationError> {
        self.protocol
            .read_register(self.channel.initial_tokens_reg())
    }

    /// Encodes and writes the bandwidth fraction.
    ///
    /// Fractions outside `[0.0, 1.0]` are logged and written anyway; range
    /// policy belongs to the caller.
    ///
    /// # Errors
    ///
    /// Returns [`IsolationError::Bus`] if the write fails.
    pub fn set_bandwidth_fraction(&mut self, fraction: f32) -> Result<(), IsolationError> {
        let raw = self.format.encode(fraction);
        if !(0.0..=1.0).contains(&fraction) {
            warn!(
                "{:?} throttle bandwidth fraction {fraction} outside [0, 1], writing raw {raw:#x}",
                self.channel
            );
        }
        debug!(
            "{:?} throttle bandwidth <- {fraction} (raw {raw:#x})",
            self.channel
        );
        self.protocol
            .write_register(self.channel.bandwidth_reg(), raw)
    }

    /// Reads and decodes the bandwidth fraction.
    ///
    /// # Errors
    ///
    /// Returns [`IsolationError::Bus`] if the read fails.
    pub fn bandwidth_fraction(&mut self) -> Result<f32, IsolationError> {
        let raw = self.protocol.read_register(self.channel.bandwidth_reg())?;
        Ok(self.format.decode(raw))
    }

    /// Writes both registers of the channel, tokens first.
    ///
    /// # Errors
    ///
    /// Returns [`IsolationError::Bus`] if either write fails.
    pub fn apply(&mut self, setting: ThrottleSetting) -> Result<(), IsolationError> {
        self.set_initial_tokens(setting.initial_tokens)?;
        self.set_bandwidth_fraction(setting.bandwidth_fraction)
    }

    /// Reads both registers of the channel.
    ///
    /// # Errors
    ///
    /// Returns [`IsolationError::Bus`] if either read fails.
    pub fn setting(&mut self) -> Result<ThrottleSetting, IsolationError> {
        Ok(ThrottleSetting {
            initial_tokens: self.initial_tokens()?,
            bandwidth_fraction: self.bandwidth_fraction()?,
        })
    }
}
