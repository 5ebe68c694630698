//! Decouple/recouple handshake shared by the control, memory and network
//! isolation blocks.
//!
//! The engine holds only addressing metadata. Every query performs a fresh
//! register read and every command a fresh write; nothing is cached.

use log::{debug, trace};

use crate::layout::{
    FaultClearPolicy, FieldSpec, IsolationLayout, DECOUPLE_REQUEST, FAULT_REG, RECOUPLE_REQUEST,
    STATUS_REG,
};
use crate::{IsolationError, RegisterBus};

/// Fault flags decoded from one read of the fault register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct FaultFlags {
    /// The IP reported a protocol timeout.
    pub timed_out: bool,
    /// The IP rejected an oversized frame. Always `false` on variants without
    /// an oversize flag.
    pub oversized: bool,
}

impl FaultFlags {
    /// Returns `true` when any fault is latched.
    #[must_use]
    pub const fn any(self) -> bool {
        self.timed_out || self.oversized
    }
}

/// Layout-driven decouple protocol bound to one IP instance.
#[derive(Debug)]
pub struct DecoupleProtocol<B> {
    bus: B,
    base_offset: u32,
    layout: &'static IsolationLayout,
}

impl<B: RegisterBus> DecoupleProtocol<B> {
    /// Binds a bus and base offset to a register layout.
    #[must_use]
    pub const fn new(bus: B, base_offset: u32, layout: &'static IsolationLayout) -> Self {
        Self {
            bus,
            base_offset,
            layout,
        }
    }

    /// Byte offset of the IP's first register.
    #[must_use]
    pub const fn base_offset(&self) -> u32 {
        self.base_offset
    }

    /// Register layout driving this instance.
    #[must_use]
    pub const fn layout(&self) -> &'static IsolationLayout {
        self.layout
    }

    /// Releases the bus.
    #[must_use]
    pub fn into_bus(self) -> B {
        self.bus
    }

    pub(crate) fn read_register(&mut self, delta: u32) -> Result<u32, IsolationError> {
        let offset = self.base_offset.wrapping_add(delta);
        let value = self.bus.read32(offset)?;
        trace!("{:?} isolation read {offset:#x} -> {value:#x}", self.layout.kind);
        Ok(value)
    }

    pub(crate) fn write_register(&mut self, delta: u32, value: u32) -> Result<(), IsolationError> {
        let offset = self.base_offset.wrapping_add(delta);
        trace!("{:?} isolation write {offset:#x} <- {value:#x}", self.layout.kind);
        self.bus.write32(offset, value)?;
        Ok(())
    }

    /// Requests decoupling and spins until the IP reports completion.
    ///
    /// There is no poll limit: completion is guaranteed by the hardware, and a
    /// hardware timeout is only observable afterwards through
    /// [`Self::is_timed_out`]. Use [`Self::decouple_bounded`] to cap the wait.
    ///
    /// # Errors
    ///
    /// Returns [`IsolationError::Bus`] if any register access fails; the poll
    /// stops at the first failure.
    pub fn decouple(&mut self) -> Result<(), IsolationError> {
        self.request_decouple()?;
        let mut polls: u64 = 0;
        loop {
            polls = polls.saturating_add(1);
            if self.poll_done()? {
                break;
            }
            core::hint::spin_loop();
        }
        debug!(
            "{:?} isolation at {:#x} decoupled after {polls} polls",
            self.layout.kind, self.base_offset
        );
        Ok(())
    }

    /// Requests decoupling and polls at most `max_polls` times.
    ///
    /// The request bit stays asserted when the wait gives up.
    ///
    /// # Errors
    ///
    /// Returns [`IsolationError::DecoupleTimeout`] when the done bit is still
    /// clear after `max_polls` reads, or [`IsolationError::Bus`] on a failed
    /// access.
    pub fn decouple_bounded(&mut self, max_polls: u32) -> Result<(), IsolationError> {
        self.request_decouple()?;
        for polls in 1..=max_polls {
            if self.poll_done()? {
                debug!(
                    "{:?} isolation at {:#x} decoupled after {polls} polls",
                    self.layout.kind, self.base_offset
                );
                return Ok(());
            }
            core::hint::spin_loop();
        }
        debug!(
            "{:?} isolation at {:#x} gave up waiting after {max_polls} polls",
            self.layout.kind, self.base_offset
        );
        Err(IsolationError::DecoupleTimeout { polls: max_polls })
    }

    /// Releases decoupling. No completion handshake exists for this direction.
    ///
    /// # Errors
    ///
    /// Returns [`IsolationError::Bus`] if the write fails.
    pub fn recouple(&mut self) -> Result<(), IsolationError> {
        debug!(
            "{:?} isolation at {:#x} recouple",
            self.layout.kind, self.base_offset
        );
        self.write_register(STATUS_REG, RECOUPLE_REQUEST)
    }

    /// Reports whether the decouple-done bit is currently set.
    ///
    /// # Errors
    ///
    /// Returns [`IsolationError::Bus`] if the read fails.
    pub fn is_decoupled(&mut self) -> Result<bool, IsolationError> {
        self.poll_done()
    }

    /// Reports the timeout flag using the layout's mask and shift.
    ///
    /// # Errors
    ///
    /// Returns [`IsolationError::Bus`] if the read fails.
    pub fn is_timed_out(&mut self) -> Result<bool, IsolationError> {
        let timeout = self.layout.timeout;
        self.read_flag(timeout)
    }

    /// Clears the timeout flag according to the layout's clear policy.
    ///
    /// With [`FaultClearPolicy::WholeRegister`] this writes `0` to the fault
    /// register and therefore clears every latched fault bit, not just the
    /// timeout.
    ///
    /// # Errors
    ///
    /// Returns [`IsolationError::Bus`] if an access fails.
    pub fn reset_timeout(&mut self) -> Result<(), IsolationError> {
        debug!(
            "{:?} isolation at {:#x} clearing timeout ({:?})",
            self.layout.kind, self.base_offset, self.layout.timeout_clear
        );
        match self.layout.timeout_clear {
            FaultClearPolicy::WholeRegister => self.write_register(FAULT_REG, 0),
            FaultClearPolicy::ReadModifyWrite => {
                let timeout = self.layout.timeout;
                self.clear_flag(timeout)
            }
        }
    }

    /// Decodes every fault flag from a single fault register read.
    ///
    /// # Errors
    ///
    /// Returns [`IsolationError::Bus`] if the read fails.
    pub fn faults(&mut self) -> Result<FaultFlags, IsolationError> {
        let word = self.read_register(FAULT_REG)?;
        Ok(FaultFlags {
            timed_out: self.layout.timeout.is_set(word),
            oversized: self.layout.oversize.is_some_and(|field| field.is_set(word)),
        })
    }

    pub(crate) fn read_flag(&mut self, field: FieldSpec) -> Result<bool, IsolationError> {
        let word = self.read_register(FAULT_REG)?;
        Ok(field.is_set(word))
    }

    pub(crate) fn clear_flag(&mut self, field: FieldSpec) -> Result<(), IsolationError> {
        let word = self.read_register(FAULT_REG)?;
        self.write_register(FAULT_REG, field.clear(word))
    }

    fn request_decouple(&mut self) -> Result<(), IsolationError> {
        debug!(
            "{:?} isolation at {:#x} decouple requested",
            self.layout.kind, self.base_offset
        );
        self.write_register(STATUS_REG, DECOUPLE_REQUEST)
    }

    fn poll_done(&mut self) -> Result<bool, IsolationError> {
        let status = self.read_register(STATUS_REG)?;
        Ok(self.layout.decouple_done.is_set(status))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::{DecoupleProtocol, FaultFlags};
    use crate::layout::{CONTROL_LAYOUT, MEMORY_LAYOUT, NETWORK_LAYOUT};
    use crate::{BusError, IsolationError, RegisterBus};

    #[derive(Default)]
    struct ScriptedBus {
        status_reads: VecDeque<u32>,
        fault: u32,
        reads: Vec<u32>,
        writes: Vec<(u32, u32)>,
        fail_reads_after: Option<usize>,
    }

    impl RegisterBus for ScriptedBus {
        fn read32(&mut self, offset: u32) -> Result<u32, BusError> {
            if self.fail_reads_after.is_some_and(|limit| self.reads.len() >= limit) {
                return Err(BusError::ReadFailed { offset });
            }
            self.reads.push(offset);
            Ok(match offset & 0xF {
                0x0 => self.status_reads.pop_front().unwrap_or(0x2),
                0x4 => self.fault,
                _ => 0,
            })
        }

        fn write32(&mut self, offset: u32, value: u32) -> Result<(), BusError> {
            self.writes.push((offset, value));
            Ok(())
        }
    }

    #[test]
    fn decouple_spins_until_done_bit_is_reported() {
        let mut bus = ScriptedBus {
            status_reads: VecDeque::from(vec![0x1, 0x1, 0x1, 0x3]),
            ..ScriptedBus::default()
        };
        let mut protocol = DecoupleProtocol::new(&mut bus, 0x100, &CONTROL_LAYOUT);

        protocol.decouple().expect("decouple completes");

        assert_eq!(bus.writes, vec![(0x100, 0x1)]);
        assert_eq!(bus.reads, vec![0x100; 4]);
    }

    #[test]
    fn decouple_ignores_bits_other_than_done() {
        let mut bus = ScriptedBus {
            status_reads: VecDeque::from(vec![0xFFFF_FFFD, 0x2]),
            ..ScriptedBus::default()
        };
        DecoupleProtocol::new(&mut bus, 0, &NETWORK_LAYOUT)
            .decouple()
            .expect("decouple completes");
        assert_eq!(bus.reads.len(), 2);
    }

    #[test]
    fn decouple_stops_on_bus_failure() {
        let mut bus = ScriptedBus {
            status_reads: VecDeque::from(vec![0x0; 8]),
            fail_reads_after: Some(3),
            ..ScriptedBus::default()
        };
        let err = DecoupleProtocol::new(&mut bus, 0x40, &MEMORY_LAYOUT)
            .decouple()
            .expect_err("bus failure must surface");
        assert_eq!(
            err,
            IsolationError::Bus(BusError::ReadFailed { offset: 0x40 })
        );
        assert_eq!(bus.reads.len(), 3);
    }

    #[test]
    fn bounded_decouple_gives_up_after_limit() {
        let mut bus = ScriptedBus {
            status_reads: VecDeque::from(vec![0x1; 10]),
            ..ScriptedBus::default()
        };
        let err = DecoupleProtocol::new(&mut bus, 0, &CONTROL_LAYOUT)
            .decouple_bounded(5)
            .expect_err("done never reported");
        assert_eq!(err, IsolationError::DecoupleTimeout { polls: 5 });
        assert_eq!(bus.reads.len(), 5);
        assert_eq!(bus.writes, vec![(0, 0x1)]);
    }

    #[test]
    fn bounded_decouple_returns_once_done() {
        let mut bus = ScriptedBus {
            status_reads: VecDeque::from(vec![0x1, 0x2]),
            ..ScriptedBus::default()
        };
        DecoupleProtocol::new(&mut bus, 0, &CONTROL_LAYOUT)
            .decouple_bounded(5)
            .expect("done on second poll");
        assert_eq!(bus.reads.len(), 2);
    }

    #[test]
    fn recouple_is_a_single_zero_write() {
        let mut bus = ScriptedBus::default();
        DecoupleProtocol::new(&mut bus, 0x200, &NETWORK_LAYOUT)
            .recouple()
            .expect("recouple");
        assert_eq!(bus.writes, vec![(0x200, 0x0)]);
        assert!(bus.reads.is_empty());
    }

    #[test]
    fn whole_register_policy_writes_zero_without_reading() {
        let mut bus = ScriptedBus {
            fault: 0xFF,
            ..ScriptedBus::default()
        };
        DecoupleProtocol::new(&mut bus, 0x10, &CONTROL_LAYOUT)
            .reset_timeout()
            .expect("reset");
        assert_eq!(bus.writes, vec![(0x14, 0x0)]);
        assert!(bus.reads.is_empty());
    }

    #[test]
    fn read_modify_write_policy_keeps_other_bits() {
        let mut bus = ScriptedBus {
            fault: 0x8 | 0x4 | 0x1,
            ..ScriptedBus::default()
        };
        DecoupleProtocol::new(&mut bus, 0x10, &NETWORK_LAYOUT)
            .reset_timeout()
            .expect("reset");
        assert_eq!(bus.writes, vec![(0x14, 0x4 | 0x1)]);
    }

    #[test]
    fn fault_snapshot_uses_layout_fields() {
        let mut bus = ScriptedBus {
            fault: 0xC,
            ..ScriptedBus::default()
        };
        let flags = DecoupleProtocol::new(&mut bus, 0, &NETWORK_LAYOUT)
            .faults()
            .expect("faults");
        assert_eq!(
            flags,
            FaultFlags {
                timed_out: true,
                oversized: true
            }
        );
        assert!(flags.any());

        let mut bus = ScriptedBus {
            fault: 0xFFFF_FFFF,
            ..ScriptedBus::default()
        };
        let flags = DecoupleProtocol::new(&mut bus, 0, &CONTROL_LAYOUT)
            .faults()
            .expect("faults");
        assert!(flags.timed_out);
        assert!(!flags.oversized);
    }

    #[test]
    fn is_decoupled_reports_current_done_bit() {
        let mut bus = ScriptedBus {
            status_reads: VecDeque::from(vec![0x1, 0x2]),
            ..ScriptedBus::default()
        };
        let mut protocol = DecoupleProtocol::new(&mut bus, 0, &MEMORY_LAYOUT);
        assert_eq!(protocol.is_decoupled(), Ok(false));
        assert_eq!(protocol.is_decoupled(), Ok(true));
        assert!(bus.writes.is_empty());
    }
}
