//! Behavioral model of the control, memory and network isolation IPs.
//!
//! The model follows the register layout of the real blocks closely enough to
//! drive the handlers end to end: a decouple request completes after a
//! configurable number of status reads, fault bits latch until software
//! writes the fault register, and throttle registers store what they are
//! given.

use isolation_core::layout::{
    AR_BANDWIDTH_REG, AR_INIT_TOKENS_REG, BANDWIDTH_REG, FAULT_REG, INIT_TOKENS_REG, STATUS_REG,
};
use isolation_core::{BusError, IsolationKind, IsolationLayout, RegisterBus};
use log::trace;

const STATUS_REQUEST_BIT: u32 = 0x1;

/// Runtime register state of a simulated isolation block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IsolationBlockState {
    requested: bool,
    done: bool,
    polls_remaining: u32,
    fault: u32,
    throttle: [u32; 4],
    status_reads: u64,
}

impl IsolationBlockState {
    /// Returns `true` while software holds the decouple request.
    #[must_use]
    pub const fn decouple_requested(&self) -> bool {
        self.requested
    }

    /// Returns `true` once the block has acknowledged the request.
    #[must_use]
    pub const fn decoupled(&self) -> bool {
        self.done
    }

    /// Raw fault register contents.
    #[must_use]
    pub const fn fault_word(&self) -> u32 {
        self.fault
    }

    /// Number of status register reads served so far.
    #[must_use]
    pub const fn status_reads(&self) -> u64 {
        self.status_reads
    }

    const fn status_bits(&self) -> u32 {
        let mut status = 0;
        if self.requested {
            status |= STATUS_REQUEST_BIT;
        }
        if self.done {
            status |= 0x2;
        }
        status
    }
}

/// Simulated isolation IP mapped at a base offset.
#[derive(Debug, Clone)]
pub struct IsolationBlockModel {
    base: u32,
    layout: &'static IsolationLayout,
    decouple_latency: u32,
    timeout_on_decouple: bool,
    state: IsolationBlockState,
}

impl IsolationBlockModel {
    /// Creates a block of `kind` at `base` that acknowledges decoupling on the
    /// first status read.
    #[must_use]
    pub const fn new(kind: IsolationKind, base: u32) -> Self {
        Self {
            base,
            layout: IsolationLayout::for_kind(kind),
            decouple_latency: 0,
            timeout_on_decouple: false,
            state: IsolationBlockState {
                requested: false,
                done: false,
                polls_remaining: 0,
                fault: 0,
                throttle: [0; 4],
                status_reads: 0,
            },
        }
    }

    /// Number of status reads that report "not done" after a request.
    #[must_use]
    pub const fn with_decouple_latency(mut self, polls: u32) -> Self {
        self.decouple_latency = polls;
        self
    }

    /// Latches the timeout fault whenever a decouple request completes,
    /// modelling an IP that forces completion after its own timeout.
    #[must_use]
    pub const fn with_timeout_on_decouple(mut self) -> Self {
        self.timeout_on_decouple = true;
        self
    }

    /// Variant being modelled.
    #[must_use]
    pub const fn kind(&self) -> IsolationKind {
        self.layout.kind
    }

    /// First byte offset decoded by the block.
    #[must_use]
    pub const fn base(&self) -> u32 {
        self.base
    }

    /// Bytes of register space decoded by the block.
    #[must_use]
    pub const fn span(&self) -> u32 {
        match self.layout.kind {
            IsolationKind::Control => 0x8,
            IsolationKind::Network => 0x10,
            IsolationKind::Memory => 0x18,
        }
    }

    /// Current register state.
    #[must_use]
    pub const fn state(&self) -> &IsolationBlockState {
        &self.state
    }

    /// Latches the IP's timeout bits in the fault register.
    pub fn raise_timeout(&mut self) {
        self.state.fault |= self.layout.timeout.mask;
    }

    /// Latches the oversize bit. Blocks without an oversize flag ignore it.
    pub fn raise_oversize(&mut self) {
        if let Some(field) = self.layout.oversize {
            self.state.fault |= field.mask;
        }
    }

    /// ORs arbitrary bits into the fault register.
    pub fn latch_fault_bits(&mut self, bits: u32) {
        self.state.fault |= bits;
    }

    /// Raw value of a throttle register, by byte delta from the base.
    #[must_use]
    pub fn throttle_word(&self, delta: u32) -> Option<u32> {
        self.throttle_slot(delta).map(|slot| self.state.throttle[slot])
    }

    fn throttle_slot(&self, delta: u32) -> Option<usize> {
        let slot = match delta {
            INIT_TOKENS_REG => 0,
            BANDWIDTH_REG => 1,
            AR_INIT_TOKENS_REG => 2,
            AR_BANDWIDTH_REG => 3,
            _ => return None,
        };
        (delta < self.span()).then_some(slot)
    }

    fn delta(&self, offset: u32) -> Option<u32> {
        let delta = offset.checked_sub(self.base)?;
        (delta < self.span() && delta % 4 == 0).then_some(delta)
    }

    fn read_status(&mut self) -> u32 {
        self.state.status_reads += 1;
        if self.state.requested && !self.state.done {
            if self.state.polls_remaining == 0 {
                self.complete_decouple();
            } else {
                self.state.polls_remaining -= 1;
            }
        }
        self.state.status_bits()
    }

    fn write_status(&mut self, value: u32) {
        let request = value & STATUS_REQUEST_BIT != 0;
        if request && !self.state.requested {
            self.state.polls_remaining = self.decouple_latency;
        }
        if !request {
            self.state.done = false;
        }
        self.state.requested = request;
    }

    fn complete_decouple(&mut self) {
        self.state.done = true;
        if self.timeout_on_decouple {
            self.raise_timeout();
        }
    }
}

impl RegisterBus for IsolationBlockModel {
    fn read32(&mut self, offset: u32) -> Result<u32, BusError> {
        let delta = self.delta(offset).ok_or(BusError::Unmapped { offset })?;
        let value = match delta {
            STATUS_REG => self.read_status(),
            FAULT_REG => self.state.fault,
            _ => self
                .throttle_word(delta)
                .ok_or(BusError::Unmapped { offset })?,
        };
        trace!("{:?} model read +{delta:#x} -> {value:#x}", self.layout.kind);
        Ok(value)
    }

    fn write32(&mut self, offset: u32, value: u32) -> Result<(), BusError> {
        let delta = self.delta(offset).ok_or(BusError::Unmapped { offset })?;
        trace!("{:?} model write +{delta:#x} <- {value:#x}", self.layout.kind);
        match delta {
            STATUS_REG => self.write_status(value),
            FAULT_REG => self.state.fault = value,
            _ => {
                let slot = self
                    .throttle_slot(delta)
                    .ok_or(BusError::Unmapped { offset })?;
                self.state.throttle[slot] = value;
            }
        }
        Ok(())
    }
}
