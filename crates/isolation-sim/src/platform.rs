//! Composite register bus routing byte offsets to simulated IP blocks.

use std::collections::BTreeSet;

use isolation_core::{BusError, RegisterBus};
use log::debug;
use thiserror::Error;

use crate::{ClockResetModel, IsolationBlockModel};

/// Platform assembly failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum SimError {
    /// The new block's register window intersects an attached block.
    #[error("block at {base:#x} (span {span:#x}) overlaps block at {existing:#x}")]
    Overlap {
        /// Base of the rejected block.
        base: u32,
        /// Span of the rejected block.
        span: u32,
        /// Base of the block already occupying the range.
        existing: u32,
    },
    /// The block's register window runs past the end of the address space.
    #[error("block at {base:#x} (span {span:#x}) exceeds the 32-bit address space")]
    OutOfRange {
        /// Base of the rejected block.
        base: u32,
        /// Span of the rejected block.
        span: u32,
    },
}

/// One access observed by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BusAccess {
    /// Completed read and the value returned.
    Read {
        /// Byte offset read.
        offset: u32,
        /// Word returned.
        value: u32,
    },
    /// Completed write and the value stored.
    Write {
        /// Byte offset written.
        offset: u32,
        /// Word written.
        value: u32,
    },
}

/// A block attached to the platform.
#[derive(Debug, Clone)]
pub enum SimDevice {
    /// Control, memory or network isolation IP.
    Isolation(IsolationBlockModel),
    /// Clock/reset decoupler IP.
    ClockReset(ClockResetModel),
}

impl SimDevice {
    const fn base(&self) -> u32 {
        match self {
            Self::Isolation(block) => block.base(),
            Self::ClockReset(block) => block.base(),
        }
    }

    const fn span(&self) -> u32 {
        match self {
            Self::Isolation(block) => block.span(),
            Self::ClockReset(block) => block.span(),
        }
    }

    const fn decodes(&self, offset: u32) -> bool {
        let base = self.base();
        offset >= base && offset - base < self.span()
    }

    fn bus(&mut self) -> &mut dyn RegisterBus {
        match self {
            Self::Isolation(block) => block as &mut dyn RegisterBus,
            Self::ClockReset(block) => block as &mut dyn RegisterBus,
        }
    }
}

/// Simulated SoC register space holding several isolation IPs.
#[derive(Debug, Clone, Default)]
pub struct SimPlatform {
    devices: Vec<SimDevice>,
    journal: Vec<BusAccess>,
    failing_reads: BTreeSet<u32>,
    failing_writes: BTreeSet<u32>,
}

impl SimPlatform {
    /// Creates an empty platform.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            devices: Vec::new(),
            journal: Vec::new(),
            failing_reads: BTreeSet::new(),
            failing_writes: BTreeSet::new(),
        }
    }

    /// Attaches an isolation block.
    ///
    /// # Errors
    ///
    /// Returns [`SimError`] when the block's window overlaps an attached
    /// block or leaves the address space.
    pub fn with_isolation(self, block: IsolationBlockModel) -> Result<Self, SimError> {
        self.attach(SimDevice::Isolation(block))
    }

    /// Attaches a clock/reset decoupler.
    ///
    /// # Errors
    ///
    /// Returns [`SimError`] when the block's window overlaps an attached
    /// block or leaves the address space.
    pub fn with_clock_reset(self, block: ClockResetModel) -> Result<Self, SimError> {
        self.attach(SimDevice::ClockReset(block))
    }

    fn attach(mut self, device: SimDevice) -> Result<Self, SimError> {
        let base = device.base();
        let span = device.span();
        let end = base
            .checked_add(span - 1)
            .ok_or(SimError::OutOfRange { base, span })?;
        if let Some(existing) = self
            .devices
            .iter()
            .find(|other| other.decodes(base) || other.decodes(end) || device.decodes(other.base()))
        {
            return Err(SimError::Overlap {
                base,
                span,
                existing: existing.base(),
            });
        }
        debug!("attached simulated block at {base:#x}..={end:#x}");
        self.devices.push(device);
        Ok(self)
    }

    /// Isolation block attached at `base`.
    #[must_use]
    pub fn isolation(&self, base: u32) -> Option<&IsolationBlockModel> {
        self.devices.iter().find_map(|device| match device {
            SimDevice::Isolation(block) if block.base() == base => Some(block),
            _ => None,
        })
    }

    /// Mutable isolation block attached at `base`, for fault injection.
    #[must_use]
    pub fn isolation_mut(&mut self, base: u32) -> Option<&mut IsolationBlockModel> {
        self.devices.iter_mut().find_map(|device| match device {
            SimDevice::Isolation(block) if block.base() == base => Some(block),
            _ => None,
        })
    }

    /// Clock/reset decoupler attached at `base`.
    #[must_use]
    pub fn clock_reset(&self, base: u32) -> Option<&ClockResetModel> {
        self.devices.iter().find_map(|device| match device {
            SimDevice::ClockReset(block) if block.base() == base => Some(block),
            _ => None,
        })
    }

    /// Every completed access, oldest first.
    #[must_use]
    pub fn journal(&self) -> &[BusAccess] {
        &self.journal
    }

    /// Completed writes, oldest first.
    #[must_use]
    pub fn writes(&self) -> Vec<(u32, u32)> {
        self.journal
            .iter()
            .filter_map(|access| match *access {
                BusAccess::Write { offset, value } => Some((offset, value)),
                BusAccess::Read { .. } => None,
            })
            .collect()
    }

    /// Number of completed reads at `offset`.
    #[must_use]
    pub fn reads_at(&self, offset: u32) -> usize {
        self.journal
            .iter()
            .filter(|access| matches!(access, BusAccess::Read { offset: at, .. } if *at == offset))
            .count()
    }

    /// Clears the access journal.
    pub fn clear_journal(&mut self) {
        self.journal.clear();
    }

    /// Makes every future read at `offset` fail.
    pub fn fail_reads_at(&mut self, offset: u32) {
        self.failing_reads.insert(offset);
    }

    /// Makes every future write at `offset` fail.
    pub fn fail_writes_at(&mut self, offset: u32) {
        self.failing_writes.insert(offset);
    }

    fn device_for(&mut self, offset: u32) -> Result<&mut SimDevice, BusError> {
        self.devices
            .iter_mut()
            .find(|device| device.decodes(offset))
            .ok_or(BusError::Unmapped { offset })
    }
}

impl RegisterBus for SimPlatform {
    fn read32(&mut self, offset: u32) -> Result<u32, BusError> {
        if self.failing_reads.contains(&offset) {
            return Err(BusError::ReadFailed { offset });
        }
        let value = self.device_for(offset)?.bus().read32(offset)?;
        self.journal.push(BusAccess::Read { offset, value });
        Ok(value)
    }

    fn write32(&mut self, offset: u32, value: u32) -> Result<(), BusError> {
        if self.failing_writes.contains(&offset) {
            return Err(BusError::WriteFailed { offset });
        }
        self.device_for(offset)?.bus().write32(offset, value)?;
        self.journal.push(BusAccess::Write { offset, value });
        Ok(())
    }
}
